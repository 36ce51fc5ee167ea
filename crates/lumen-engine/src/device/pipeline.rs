use std::collections::HashMap;

use crate::gpu::{BlendMode, GpuError, Primitive, ProgramId};
use crate::vertex::{AttributeType, VertexAttribute, VertexLayout};

/// Everything a render pipeline is specialized on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub program: ProgramId,
    pub blend: BlendMode,
    pub primitive: Primitive,
    pub format: wgpu::TextureFormat,
    pub layout: VertexLayout,
}

/// Shader modules of one linked program.
pub(crate) struct CompiledProgram {
    pub label: String,
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    /// Stage sources without the prelude, for uniform lookups.
    pub source: String,
}

/// Render pipelines built on first use and reused afterwards.
#[derive(Default)]
pub(crate) struct PipelineCache {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Builds the pipeline for `key` unless it is cached.
    pub fn ensure(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        key: &PipelineKey,
        program: &CompiledProgram,
    ) -> Result<(), GpuError> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }

        let attributes = key
            .layout
            .attributes()
            .iter()
            .map(|a| {
                Ok(wgpu::VertexAttribute {
                    format: vertex_format(a).ok_or_else(|| {
                        GpuError::Device(format!("unsupported vertex attribute {a:?}"))
                    })?,
                    offset: a.offset as u64,
                    shader_location: a.index,
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;

        let buffers = [wgpu::VertexBufferLayout {
            array_stride: key.layout.stride() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let label = format!("lumen {} pipeline", program.label);

        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),

            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: blend_state(key.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: topology(key.primitive),
                strip_index_format: match key.primitive {
                    Primitive::TriangleStrip | Primitive::LineStrip => {
                        Some(wgpu::IndexFormat::Uint32)
                    }
                    _ => None,
                },
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(GpuError::Device(format!("{label}: {err}")));
        }

        log::debug!("PipelineCache: built {label} ({:?}, {:?})", key.blend, key.primitive);
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    /// Drops every pipeline built from `program`.
    pub fn evict_program(&mut self, program: ProgramId) {
        self.pipelines.retain(|k, _| k.program != program);
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }
}

pub(crate) fn blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Disabled => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => {
            let add = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState {
                color: add,
                alpha: add,
            })
        }
    }
}

pub(crate) fn topology(primitive: Primitive) -> wgpu::PrimitiveTopology {
    match primitive {
        Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        Primitive::Lines => wgpu::PrimitiveTopology::LineList,
        Primitive::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Primitive::Points => wgpu::PrimitiveTopology::PointList,
    }
}

pub(crate) fn vertex_format(a: &VertexAttribute) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    let f = match (a.ty, a.components, a.normalized) {
        (AttributeType::Float32, 1, _) => F::Float32,
        (AttributeType::Float32, 2, _) => F::Float32x2,
        (AttributeType::Float32, 3, _) => F::Float32x3,
        (AttributeType::Float32, 4, _) => F::Float32x4,

        (AttributeType::Uint8, 2, false) => F::Uint8x2,
        (AttributeType::Uint8, 4, false) => F::Uint8x4,
        (AttributeType::Uint8, 2, true) => F::Unorm8x2,
        (AttributeType::Uint8, 4, true) => F::Unorm8x4,

        (AttributeType::Uint16, 2, false) => F::Uint16x2,
        (AttributeType::Uint16, 4, false) => F::Uint16x4,
        (AttributeType::Uint16, 2, true) => F::Unorm16x2,
        (AttributeType::Uint16, 4, true) => F::Unorm16x4,

        (AttributeType::Sint16, 2, false) => F::Sint16x2,
        (AttributeType::Sint16, 4, false) => F::Sint16x4,
        (AttributeType::Sint16, 2, true) => F::Snorm16x2,
        (AttributeType::Sint16, 4, true) => F::Snorm16x4,

        (AttributeType::Uint32, 1, false) => F::Uint32,
        (AttributeType::Uint32, 2, false) => F::Uint32x2,
        (AttributeType::Uint32, 3, false) => F::Uint32x3,
        (AttributeType::Uint32, 4, false) => F::Uint32x4,

        (AttributeType::Sint32, 1, false) => F::Sint32,
        (AttributeType::Sint32, 2, false) => F::Sint32x2,
        (AttributeType::Sint32, 3, false) => F::Sint32x3,
        (AttributeType::Sint32, 4, false) => F::Sint32x4,

        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::canonical_layout;

    #[test]
    fn canonical_layout_maps_to_float_formats() {
        let formats: Vec<_> = canonical_layout()
            .attributes()
            .iter()
            .map(vertex_format)
            .collect();
        assert_eq!(
            formats,
            vec![
                Some(wgpu::VertexFormat::Float32x2),
                Some(wgpu::VertexFormat::Float32x2),
                Some(wgpu::VertexFormat::Float32x4),
            ]
        );
    }

    #[test]
    fn odd_integer_shapes_are_rejected() {
        let a = VertexAttribute {
            index: 0,
            components: 3,
            ty: AttributeType::Uint8,
            normalized: true,
            offset: 0,
        };
        assert_eq!(vertex_format(&a), None);
    }

    #[test]
    fn blend_modes_map_to_states() {
        assert_eq!(blend_state(BlendMode::Disabled), None);
        assert_eq!(
            blend_state(BlendMode::Alpha),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
        let add = blend_state(BlendMode::Additive).unwrap();
        assert_eq!(add.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(add.color.dst_factor, wgpu::BlendFactor::One);
    }
}
