//! Static index buffer that turns triangle fans into triangle lists.

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// Largest fan the shared index buffer covers.
pub const FAN_INDEX_BUFFER_VERTICES: u32 = 256;

/// Number of list indices needed to draw a fan of `vertex_count` vertices.
pub const fn fan_index_count(vertex_count: u32) -> u32 {
    if vertex_count < 3 {
        0
    } else {
        (vertex_count - 2) * 3
    }
}

/// Triangle-list indices for a fan of `vertex_count` vertices.
pub fn fan_indices(vertex_count: u32) -> Vec<u16> {
    (0..vertex_count.saturating_sub(2))
        .flat_map(|i| [0, (i + 1) as u16, (i + 2) as u16])
        .collect()
}

/// Build the fan index buffer for fans up to [`FAN_INDEX_BUFFER_VERTICES`].
pub fn create_fan_index_buffer(
    device: &Arc<GraphicsDevice>,
) -> Result<Arc<Buffer>, GraphicsError> {
    let indices = fan_indices(FAN_INDEX_BUFFER_VERTICES);
    let bytes: &[u8] = bytemuck::cast_slice(&indices);
    let descriptor = BufferDescriptor::new(bytes.len() as u64, BufferUsage::INDEX)
        .with_label("fan_index_buffer");
    let buffer = device.create_buffer(&descriptor)?;
    device.backend().write_buffer(buffer.handle(), 0, bytes)?;
    log::debug!("Created fan index buffer ({} indices)", indices.len());
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_fan_indices() {
        assert_eq!(fan_indices(5), vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
        assert!(fan_indices(2).is_empty());
        assert_eq!(fan_index_count(5), 9);
        assert_eq!(fan_index_count(1), 0);
    }

    #[test]
    fn test_fan_index_buffer_contents() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone()).unwrap();
        let buffer = create_fan_index_buffer(&device).unwrap();

        let expected = fan_index_count(FAN_INDEX_BUFFER_VERTICES) as u64 * 2;
        assert_eq!(buffer.size(), expected);
        let head: Vec<u16> = backend
            .read_buffer(buffer.handle(), 0, 12)
            .unwrap()
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(head, vec![0, 1, 2, 0, 2, 3]);
    }
}
