/// Descriptor-set layouts, pipeline layouts and pipelines
///
/// Pipelines use dynamic rendering: attachment formats come from the
/// description instead of a render pass object.

use std::ffi::CString;
use ash::vk;
use ash::vk::Handle;
use prism_rhi::prism::rhi::{
    Descriptor, DynamicState, GraphicsPipelineDesc, NativePipeline, PipelineDesc,
    RhiHandle, VertexInputRate,
};
use prism_rhi::prism::Result;
use prism_rhi::rhi_err;

use crate::vulkan_context::{GpuContext, LOG_SOURCE};
use crate::vulkan_conversions::{
    blend_op_to_vk, blend_to_vk, compare_to_vk, cull_mode_to_vk, descriptor_type_to_vk,
    format_to_vk, polygon_mode_to_vk, shader_stage_to_vk, stencil_op_to_vk, topology_to_vk,
};

// ===== DESCRIPTOR SET LAYOUTS =====

/// Layout bindings of a descriptor list, push constants excluded
pub(crate) fn layout_bindings(descriptors: &[Descriptor]) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    descriptors
        .iter()
        .filter_map(|descriptor| {
            let descriptor_type = descriptor_type_to_vk(descriptor.ty)?;
            Some(vk::DescriptorSetLayoutBinding::default()
                .binding(descriptor.slot)
                .descriptor_type(descriptor_type)
                .descriptor_count(descriptor.array_length.max(1))
                .stage_flags(shader_stage_to_vk(descriptor.stage)))
        })
        .collect()
}

pub(crate) fn create_descriptor_set_layout(
    ctx: &GpuContext,
    name: &str,
    descriptors: &[Descriptor],
) -> Result<RhiHandle> {
    let bindings = layout_bindings(descriptors);
    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

    let layout = unsafe { ctx.device.create_descriptor_set_layout(&create_info, None) }
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create descriptor set layout '{}': {:?}", name, e))?;

    ctx.name_object(layout, name);
    Ok(layout.as_raw())
}

// ===== PIPELINES =====

/// Create the pipeline layout, then the graphics or compute pipeline
pub(crate) fn create_pipeline(ctx: &GpuContext, desc: &PipelineDesc) -> Result<NativePipeline> {
    let set_layouts: Vec<vk::DescriptorSetLayout> = desc
        .set_layouts
        .iter()
        .map(|handle| vk::DescriptorSetLayout::from_raw(*handle))
        .collect();

    let push_constant_ranges: Vec<vk::PushConstantRange> = desc
        .push_constant_ranges
        .iter()
        .map(|range| vk::PushConstantRange {
            stage_flags: shader_stage_to_vk(range.stages),
            offset: range.offset,
            size: range.size,
        })
        .collect();

    let layout_create_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(&set_layouts)
        .push_constant_ranges(&push_constant_ranges);

    let layout = unsafe { ctx.device.create_pipeline_layout(&layout_create_info, None) }
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create pipeline layout for '{}': {:?}", desc.name, e))?;

    // Entry point names must outlive the create call
    let entry_points: Vec<CString> = desc
        .stages
        .iter()
        .map(|stage| CString::new(stage.entry_point.as_str()).unwrap_or_default())
        .collect();
    let stages: Vec<vk::PipelineShaderStageCreateInfo> = desc
        .stages
        .iter()
        .zip(entry_points.iter())
        .map(|(stage, entry_point)| {
            vk::PipelineShaderStageCreateInfo::default()
                .stage(shader_stage_to_vk(stage.stage))
                .module(vk::ShaderModule::from_raw(stage.module))
                .name(entry_point)
        })
        .collect();

    let result = match &desc.graphics {
        Some(graphics) => create_graphics_pipeline(ctx, layout, &stages, graphics),
        None => match stages.first() {
            Some(stage) => {
                let create_info = vk::ComputePipelineCreateInfo::default()
                    .stage(*stage)
                    .layout(layout);
                unsafe {
                    ctx.device.create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
                }
                .map(|pipelines| pipelines[0])
                .map_err(|(_, e)| e)
            }
            None => Err(vk::Result::ERROR_INITIALIZATION_FAILED),
        },
    };

    match result {
        Ok(pipeline) => {
            ctx.name_object(layout, &desc.name);
            ctx.name_object(pipeline, &desc.name);
            Ok(NativePipeline {
                layout: layout.as_raw(),
                pipeline: pipeline.as_raw(),
            })
        }
        Err(e) => {
            unsafe { ctx.device.destroy_pipeline_layout(layout, None) };
            Err(rhi_err!(LOG_SOURCE, "Failed to create pipeline '{}': {:?}", desc.name, e))
        }
    }
}

fn create_graphics_pipeline(
    ctx: &GpuContext,
    layout: vk::PipelineLayout,
    stages: &[vk::PipelineShaderStageCreateInfo],
    graphics: &GraphicsPipelineDesc,
) -> std::result::Result<vk::Pipeline, vk::Result> {
    // Vertex input
    let bindings: Vec<vk::VertexInputBindingDescription> = graphics
        .vertex_bindings
        .iter()
        .map(|binding| vk::VertexInputBindingDescription {
            binding: binding.binding,
            stride: binding.stride,
            input_rate: match binding.input_rate {
                VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
                VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
            },
        })
        .collect();
    let attributes: Vec<vk::VertexInputAttributeDescription> = graphics
        .vertex_attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: attribute.binding,
            format: format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(topology_to_vk(graphics.topology))
        .primitive_restart_enable(false);

    // Viewport & scissor (ignored by the driver when dynamic)
    let viewports = [vk::Viewport {
        x: graphics.viewport.x,
        y: graphics.viewport.y,
        width: graphics.viewport.width,
        height: graphics.viewport.height,
        min_depth: graphics.viewport.depth_min,
        max_depth: graphics.viewport.depth_max,
    }];
    let scissors = [rect_to_vk(graphics)];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let dynamic_states: Vec<vk::DynamicState> = graphics
        .dynamic_states
        .iter()
        .map(|state| match state {
            DynamicState::Viewport => vk::DynamicState::VIEWPORT,
            DynamicState::Scissor => vk::DynamicState::SCISSOR,
        })
        .collect();
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    // Rasterizer
    let rasterizer = &graphics.rasterizer;
    let front_face = if graphics.front_face_clockwise {
        vk::FrontFace::CLOCKWISE
    } else {
        vk::FrontFace::COUNTER_CLOCKWISE
    };
    let mut depth_clip = vk::PipelineRasterizationDepthClipStateCreateInfoEXT::default();
    let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(polygon_mode_to_vk(rasterizer.polygon_mode))
        .cull_mode(cull_mode_to_vk(rasterizer.cull_mode))
        .front_face(front_face)
        .depth_bias_enable(graphics.depth_bias.enabled)
        .depth_bias_constant_factor(graphics.depth_bias.constant_factor)
        .depth_bias_clamp(graphics.depth_bias.clamp)
        .depth_bias_slope_factor(graphics.depth_bias.slope_factor)
        .line_width(rasterizer.line_width);
    if let Some(enable) = depth_clip_state(rasterizer.depth_clip_enabled, ctx.depth_clip_enable) {
        depth_clip = depth_clip.depth_clip_enable(enable);
        rasterization = rasterization.push_next(&mut depth_clip);
    }

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_shading_enable(false);

    // Depth-stencil, same operations for both faces
    let depth_stencil_state = &graphics.depth_stencil;
    let stencil_face = vk::StencilOpState {
        fail_op: stencil_op_to_vk(depth_stencil_state.stencil_fail_operation),
        pass_op: stencil_op_to_vk(depth_stencil_state.stencil_pass_operation),
        depth_fail_op: stencil_op_to_vk(depth_stencil_state.stencil_depth_fail_operation),
        compare_op: compare_to_vk(depth_stencil_state.stencil_comparison_function),
        compare_mask: depth_stencil_state.stencil_read_mask,
        write_mask: depth_stencil_state.stencil_write_mask,
        reference: graphics.stencil_reference,
    };
    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(depth_stencil_state.depth_test_enabled)
        .depth_write_enable(depth_stencil_state.depth_write_enabled)
        .depth_compare_op(compare_to_vk(depth_stencil_state.depth_comparison_function))
        .depth_bounds_test_enable(false)
        .min_depth_bounds(graphics.depth_bounds.0)
        .max_depth_bounds(graphics.depth_bounds.1)
        .stencil_test_enable(depth_stencil_state.stencil_test_enabled)
        .front(stencil_face)
        .back(stencil_face);

    // Blend
    let blend = &graphics.blend;
    let attachment = vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(blend.blend_enabled)
        .src_color_blend_factor(blend_to_vk(blend.source_blend))
        .dst_color_blend_factor(blend_to_vk(blend.dest_blend))
        .color_blend_op(blend_op_to_vk(blend.blend_op))
        .src_alpha_blend_factor(blend_to_vk(blend.source_blend_alpha))
        .dst_alpha_blend_factor(blend_to_vk(blend.dest_blend_alpha))
        .alpha_blend_op(blend_op_to_vk(blend.blend_op_alpha))
        .color_write_mask(vk::ColorComponentFlags::RGBA);
    let attachments = vec![attachment; graphics.blend_attachment_count];
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&attachments)
        .blend_constants(graphics.blend_constants);

    // Dynamic rendering formats
    let color_formats: Vec<vk::Format> = graphics.color_formats.iter().map(|f| format_to_vk(*f)).collect();
    let mut rendering = vk::PipelineRenderingCreateInfo::default()
        .color_attachment_formats(&color_formats)
        .depth_attachment_format(format_to_vk(graphics.depth_format))
        .stencil_attachment_format(format_to_vk(graphics.stencil_format));

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .push_next(&mut rendering)
        .stages(stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic_state)
        .layout(layout);

    unsafe {
        ctx.device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
    }
    .map(|pipelines| pipelines[0])
    .map_err(|(_, e)| e)
}

/// Depth clip flag to chain into the rasterizer, None when the default (clipping on) applies
///
/// Without VK_EXT_depth_clip_enable clipping cannot be turned off.
pub(crate) fn depth_clip_state(depth_clip_enabled: bool, extension_enabled: bool) -> Option<bool> {
    if extension_enabled {
        return Some(depth_clip_enabled);
    }
    prism_rhi::rhi_assert!(depth_clip_enabled, LOG_SOURCE,
        "Disabling depth clip requires VK_EXT_depth_clip_enable, which the device does not support");
    None
}

fn rect_to_vk(graphics: &GraphicsPipelineDesc) -> vk::Rect2D {
    let scissor = &graphics.scissor;
    vk::Rect2D {
        offset: vk::Offset2D {
            x: scissor.left as i32,
            y: scissor.top as i32,
        },
        extent: vk::Extent2D {
            width: (scissor.right - scissor.left).max(0.0) as u32,
            height: (scissor.bottom - scissor.top).max(0.0) as u32,
        },
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
