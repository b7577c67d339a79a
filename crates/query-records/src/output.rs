use std::io::{BufWriter, Write};

use crate::error::AppResult;

/// Newline-delimited JSON writer.
pub struct NdjsonWriter<W: Write> {
    out: BufWriter<W>,
}

impl NdjsonWriter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: BufWriter::new(inner),
        }
    }

    pub fn write_json_line<T: serde::Serialize>(&mut self, v: &T) -> AppResult<()> {
        serde_json::to_writer(&mut self.out, v)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_all_lines<'a, T, I>(&mut self, items: I) -> AppResult<usize>
    where
        T: serde::Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut n = 0;
        for item in items {
            self.write_json_line(item)?;
            n += 1;
        }
        self.out.flush()?;
        Ok(n)
    }

    pub fn into_inner(self) -> AppResult<W> {
        self.out
            .into_inner()
            .map_err(|e| crate::error::AppError::Io(e.into_error()))
    }
}
