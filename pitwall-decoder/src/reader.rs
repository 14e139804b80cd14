//! Bounds-checked little-endian cursor over a datagram

use crate::classify::PacketKind;
use crate::error::DecodeError;

pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    kind: PacketKind,
}

impl<'a> ByteReader<'a> {
    /// Start reading `data` at `offset`; out-of-bounds reads are reported
    /// against `kind`.
    pub fn at(data: &'a [u8], offset: usize, kind: PacketKind) -> Self {
        Self {
            data,
            pos: offset,
            kind,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let data = self.data;
        let end = self.pos + N;
        let bytes = data.get(self.pos..end).ok_or(DecodeError::TruncatedRecord {
            kind: self.kind,
            needed: end,
            len: data.len(),
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        self.take::<1>().map(|[b]| b)
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        self.take::<1>().map(i8::from_le_bytes)
    }

    #[inline]
    pub fn u16_le(&mut self) -> Result<u16, DecodeError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn u32_le(&mut self) -> Result<u32, DecodeError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn u64_le(&mut self) -> Result<u64, DecodeError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    /// Non-finite floats read as 0.0
    #[inline]
    pub fn f32_le(&mut self) -> Result<f32, DecodeError> {
        self.take::<4>()
            .map(f32::from_le_bytes)
            .map(|v| if v.is_finite() { v } else { 0.0 })
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(DecodeError::TruncatedRecord {
                kind: self.kind,
                needed: end,
                len: self.data.len(),
            });
        }
        self.pos = end;
        Ok(())
    }

    pub fn u8_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.take::<N>()
    }

    pub fn u16_le_array<const N: usize>(&mut self) -> Result<[u16; N], DecodeError> {
        let mut out = [0u16; N];
        for v in out.iter_mut() {
            *v = self.u16_le()?;
        }
        Ok(out)
    }

    pub fn f32_le_array<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut out = [0f32; N];
        for v in out.iter_mut() {
            *v = self.f32_le()?;
        }
        Ok(out)
    }
}
