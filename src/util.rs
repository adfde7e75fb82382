use crate::error::SchemaError;

/// Bounds-checked big-endian cursor over a block payload.
///
/// Every read names the payload kind so truncation errors say which schema failed.
pub struct PayloadReader<'a> {
    kind: &'static str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(kind: &'static str, bytes: &'a [u8]) -> Self {
        PayloadReader { kind, bytes, pos: 0 }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], SchemaError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(SchemaError::Truncated {
                kind: self.kind,
                offset: self.pos,
                needed: n,
                len: self.bytes.len(),
            }),
        }
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], SchemaError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, SchemaError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, SchemaError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, SchemaError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Fail if anything is left over
    pub fn finish(self) -> Result<(), SchemaError> {
        let extra = self.bytes.len() - self.pos;
        if extra != 0 {
            return Err(SchemaError::TrailingBytes {
                kind: self.kind,
                extra,
            });
        }
        Ok(())
    }
}
