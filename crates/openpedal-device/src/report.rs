//! Input report decoding.
//!
//! Pedal boxes report each axis as an unsigned 16-bit little-endian field,
//! packed back to back after an optional report header.

/// Upper bound on axes decoded from a single report.
pub const MAX_AXES: usize = 8;

/// Decoded axis values of one input report, stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisReport {
    values: [u16; MAX_AXES],
    len: usize,
}

impl AxisReport {
    /// Decode `axis_count` little-endian u16 fields starting at `offset`.
    ///
    /// Returns `None` when the report is too short to hold every field.
    pub fn parse(report: &[u8], offset: usize, axis_count: usize) -> Option<Self> {
        let axis_count = axis_count.min(MAX_AXES);
        let end = offset.checked_add(axis_count.checked_mul(2)?)?;
        let payload = report.get(offset..end)?;

        let mut values = [0u16; MAX_AXES];
        for (slot, chunk) in values.iter_mut().zip(payload.chunks_exact(2)) {
            if let [lo, hi] = *chunk {
                *slot = u16::from_le_bytes([lo, hi]);
            }
        }
        Some(Self { values, len: axis_count })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, axis: usize) -> Option<u16> {
        if axis < self.len { self.values.get(axis).copied() } else { None }
    }

    /// Axis value normalized to `[-1.0, 1.0]`.
    pub fn normalized(&self, axis: usize) -> Option<f32> {
        self.get(axis)
            .map(|value| f32::from(value) / f32::from(u16::MAX) * 2.0 - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header() -> Result<(), Box<dyn std::error::Error>> {
        let report = [0x01, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x80];
        let parsed = AxisReport::parse(&report, 1, 3).ok_or("report too short")?;
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.get(0), Some(0));
        assert_eq!(parsed.get(1), Some(0xFFFF));
        assert_eq!(parsed.get(2), Some(0x8000));
        assert_eq!(parsed.get(3), None);
        Ok(())
    }

    #[test]
    fn test_short_report_rejected() {
        assert!(AxisReport::parse(&[0x01, 0x00, 0x10], 1, 2).is_none());
        assert!(AxisReport::parse(&[], 0, 1).is_none());
    }

    #[test]
    fn test_normalized_endpoints() -> Result<(), Box<dyn std::error::Error>> {
        let parsed = AxisReport::parse(&[0x00, 0x00, 0xFF, 0xFF], 0, 2).ok_or("report too short")?;
        assert_eq!(parsed.normalized(0), Some(-1.0));
        assert_eq!(parsed.normalized(1), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_axis_count_capped() -> Result<(), Box<dyn std::error::Error>> {
        let report = [0u8; 64];
        let parsed = AxisReport::parse(&report, 0, 40).ok_or("report too short")?;
        assert_eq!(parsed.len(), MAX_AXES);
        Ok(())
    }
}
