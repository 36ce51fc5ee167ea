use crate::config::ResourceLimits;
use crate::gpu::{BufferId, BufferKind, GpuBackend, GpuError};
use crate::vertex::Vertex;

const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

/// Vertex and index buffer shared by every draw.
///
/// Capacities are counted in elements. An upload larger than the current
/// capacity replaces the buffer with one rounded up to the next power of two.
#[derive(Debug)]
pub struct GeometryBuffers {
    vertex: BufferId,
    vertex_capacity: usize,
    index: BufferId,
    index_capacity: usize,
}

impl GeometryBuffers {
    pub fn allocate<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        limits: &ResourceLimits,
    ) -> Result<Self, GpuError> {
        let vertex_capacity = limits.vertex_capacity.max(1);
        let index_capacity = limits.index_capacity.max(1);

        let vertex = gpu.create_buffer(
            "geometry vertices",
            BufferKind::Vertex,
            vertex_capacity as u64 * Vertex::SIZE,
        )?;
        let index = match gpu.create_buffer(
            "geometry indices",
            BufferKind::Index,
            index_capacity as u64 * INDEX_SIZE,
        ) {
            Ok(index) => index,
            Err(err) => {
                gpu.delete_buffer(vertex);
                return Err(err);
            }
        };

        log::debug!(
            "GeometryBuffers: allocated {vertex_capacity} vertices, {index_capacity} indices"
        );
        Ok(Self {
            vertex,
            vertex_capacity,
            index,
            index_capacity,
        })
    }

    #[inline]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex
    }

    #[inline]
    pub fn index_buffer(&self) -> BufferId {
        self.index
    }

    #[inline]
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    #[inline]
    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    pub fn upload_vertices<B: GpuBackend + ?Sized>(
        &mut self,
        gpu: &mut B,
        vertices: &[Vertex],
    ) -> Result<(), GpuError> {
        if vertices.is_empty() {
            return Ok(());
        }
        if vertices.len() > self.vertex_capacity {
            let cap = vertices.len().next_power_of_two();
            let replacement = gpu.create_buffer(
                "geometry vertices",
                BufferKind::Vertex,
                cap as u64 * Vertex::SIZE,
            )?;
            gpu.delete_buffer(self.vertex);
            log::debug!(
                "GeometryBuffers: vertex capacity {} -> {cap}",
                self.vertex_capacity
            );
            self.vertex = replacement;
            self.vertex_capacity = cap;
        }
        gpu.write_buffer(self.vertex, 0, bytemuck::cast_slice(vertices))
    }

    pub fn upload_indices<B: GpuBackend + ?Sized>(
        &mut self,
        gpu: &mut B,
        indices: &[u32],
    ) -> Result<(), GpuError> {
        if indices.is_empty() {
            return Ok(());
        }
        if indices.len() > self.index_capacity {
            let cap = indices.len().next_power_of_two();
            let replacement =
                gpu.create_buffer("geometry indices", BufferKind::Index, cap as u64 * INDEX_SIZE)?;
            gpu.delete_buffer(self.index);
            log::debug!(
                "GeometryBuffers: index capacity {} -> {cap}",
                self.index_capacity
            );
            self.index = replacement;
            self.index_capacity = cap;
        }
        gpu.write_buffer(self.index, 0, bytemuck::cast_slice(indices))
    }

    pub fn release<B: GpuBackend + ?Sized>(&self, gpu: &mut B) {
        gpu.delete_buffer(self.vertex);
        gpu.delete_buffer(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    fn limits(vertices: usize, indices: usize) -> ResourceLimits {
        ResourceLimits {
            vertex_capacity: vertices,
            index_capacity: indices,
            texture_budget_bytes: None,
        }
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn sizes_follow_limits() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let buffers = GeometryBuffers::allocate(&mut gpu, &limits(16, 32)).unwrap();
        assert_eq!(gpu.buffer_data(buffers.vertex_buffer()).unwrap().len(), 16 * 32);
        assert_eq!(gpu.buffer_data(buffers.index_buffer()).unwrap().len(), 32 * 4);
        assert_eq!(gpu.buffer_kind(buffers.index_buffer()), Some(BufferKind::Index));
    }

    #[test]
    fn failed_index_allocation_releases_vertex_buffer() {
        let mut gpu = HeadlessBackend::new(8, 8);
        gpu.fail_label("geometry indices");
        assert!(GeometryBuffers::allocate(&mut gpu, &limits(4, 4)).is_err());
        assert_eq!(gpu.live_handles(), 0);
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn vertex_upload_grows_to_power_of_two() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut buffers = GeometryBuffers::allocate(&mut gpu, &limits(2, 2)).unwrap();
        let old = buffers.vertex_buffer();

        let vertices = vec![Vertex::default(); 5];
        buffers.upload_vertices(&mut gpu, &vertices).unwrap();

        assert_eq!(buffers.vertex_capacity(), 8);
        assert_ne!(buffers.vertex_buffer(), old);
        assert!(gpu.buffer_data(old).is_none());
        assert_eq!(gpu.live_handles(), 2);
    }

    #[test]
    fn upload_within_capacity_keeps_buffer() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut buffers = GeometryBuffers::allocate(&mut gpu, &limits(8, 8)).unwrap();
        let old = buffers.index_buffer();
        buffers.upload_indices(&mut gpu, &[0, 1, 2]).unwrap();
        assert_eq!(buffers.index_buffer(), old);
        assert_eq!(&gpu.buffer_data(old).unwrap()[..12], bytemuck::cast_slice::<u32, u8>(&[0, 1, 2]));
    }

    #[test]
    fn failed_growth_keeps_previous_buffer() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut buffers = GeometryBuffers::allocate(&mut gpu, &limits(1, 1)).unwrap();
        let old = buffers.vertex_buffer();
        gpu.fail_label("geometry vertices");

        let vertices = vec![Vertex::default(); 3];
        assert!(buffers.upload_vertices(&mut gpu, &vertices).is_err());
        assert_eq!(buffers.vertex_buffer(), old);
        assert_eq!(buffers.vertex_capacity(), 1);
    }
}
