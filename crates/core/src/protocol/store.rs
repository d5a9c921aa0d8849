//! Destination capability for decoded answer elements.
//!
//! The framer does not know how a device models its properties. It only asks
//! an [`ElementStore`] for a slot by element id and scatters the element's
//! values into the bytes that slot hands back.

use std::collections::HashMap;

/// Storage for the values of one element id.
pub trait ElementSlot {
    /// Distance in bytes between consecutive values in this slot's storage.
    fn stride(&self) -> usize;

    /// Resize to `count` values and return the backing bytes
    /// (at least `count * stride()` long).
    fn resize(&mut self, count: usize) -> &mut [u8];
}

/// Lookup of element slots by id.
pub trait ElementStore {
    fn find_slot(&mut self, id: u16) -> Option<&mut dyn ElementSlot>;
}

/// A property kept as raw little-endian values of a fixed stride.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProperty {
    stride: usize,
    count: usize,
    data: Vec<u8>,
}

impl RawProperty {
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            count: 0,
            data: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes of value `index`.
    pub fn value(&self, index: usize) -> Option<&[u8]> {
        if index >= self.count {
            return None;
        }
        let at = index * self.stride;
        self.data.get(at..at + self.stride)
    }

    pub fn u16_at(&self, index: usize) -> Option<u16> {
        let v = self.value(index)?;
        Some(u16::from_le_bytes([*v.first()?, *v.get(1)?]))
    }

    pub fn u32_at(&self, index: usize) -> Option<u32> {
        let v = self.value(index)?;
        Some(u32::from_le_bytes([
            *v.first()?,
            *v.get(1)?,
            *v.get(2)?,
            *v.get(3)?,
        ]))
    }
}

impl ElementSlot for RawProperty {
    fn stride(&self) -> usize {
        self.stride
    }

    fn resize(&mut self, count: usize) -> &mut [u8] {
        self.count = count;
        self.data.resize(count * self.stride, 0);
        &mut self.data
    }
}

/// Element store backed by a map of registered ids.
///
/// Ids that were never [`register`](Self::register)ed are skipped when an
/// answer is decoded.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    properties: HashMap<u16, RawProperty>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an element id and the stride its values are stored with.
    pub fn register(&mut self, id: u16, stride: usize) -> &mut Self {
        self.properties.insert(id, RawProperty::new(stride));
        self
    }

    pub fn get(&self, id: u16) -> Option<&RawProperty> {
        self.properties.get(&id)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl ElementStore for PropertyMap {
    fn find_slot(&mut self, id: u16) -> Option<&mut dyn ElementSlot> {
        self.properties
            .get_mut(&id)
            .map(|p| p as &mut dyn ElementSlot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_has_no_slot() {
        let mut map = PropertyMap::new();
        map.register(0x10, 4);
        assert!(map.find_slot(0x11).is_none());
        assert!(map.find_slot(0x10).is_some());
    }

    #[test]
    fn resize_tracks_count() {
        let mut p = RawProperty::new(2);
        let bytes = p.resize(3);
        assert_eq!(bytes.len(), 6);
        bytes[2..4].copy_from_slice(&0xBEEFu16.to_le_bytes());
        assert_eq!(p.count(), 3);
        assert_eq!(p.u16_at(1), Some(0xBEEF));
        assert_eq!(p.u16_at(3), None);
    }
}
