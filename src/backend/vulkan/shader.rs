//! WGSL to SPIR-V compilation through naga.

use ash::vk;

use crate::error::GraphicsError;

/// Parse, validate and translate one entry point of a WGSL module to SPIR-V.
pub fn compile_wgsl(
    source: &str,
    stage: naga::ShaderStage,
    entry_point: &str,
) -> Result<Vec<u32>, GraphicsError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| GraphicsError::ShaderCompilationFailed(format!("WGSL parse error: {e}")))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator
        .validate(&module)
        .map_err(|e| GraphicsError::ShaderCompilationFailed(format!("Validation error: {e}")))?;

    if !module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry_point && ep.stage == stage)
    {
        return Err(GraphicsError::ShaderCompilationFailed(format!(
            "Entry point '{}' not found for stage {:?}",
            entry_point, stage
        )));
    }

    let options = naga::back::spv::Options {
        lang_version: (1, 3),
        flags: naga::back::spv::WriterFlags::empty(),
        capabilities: None,
        bounds_check_policies: naga::proc::BoundsCheckPolicies::default(),
        binding_map: Default::default(),
        debug_info: None,
        zero_initialize_workgroup_memory: naga::back::spv::ZeroInitializeWorkgroupMemoryMode::None,
    };

    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: stage,
        entry_point: entry_point.to_string(),
    };

    naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options)).map_err(|e| {
        GraphicsError::ShaderCompilationFailed(format!("SPIR-V generation error: {e}"))
    })
}

/// Compile an entry point and wrap it in a shader module.
pub fn create_shader_module(
    device: &ash::Device,
    source: &str,
    stage: naga::ShaderStage,
    entry_point: &str,
) -> Result<vk::ShaderModule, GraphicsError> {
    let spv = compile_wgsl(source, stage, entry_point)?;
    let create_info = vk::ShaderModuleCreateInfo::default().code(&spv);

    unsafe { device.create_shader_module(&create_info, None) }.map_err(|e| {
        GraphicsError::ShaderCompilationFailed(format!("Failed to create shader module: {:?}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    return vec4<f32>(x, 0.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

    #[test]
    fn test_compile_wgsl_produces_spirv() {
        let spv = compile_wgsl(TRIANGLE, naga::ShaderStage::Vertex, "vs_main").unwrap();
        // SPIR-V magic number
        assert_eq!(spv[0], 0x0723_0203);
    }

    #[test]
    fn test_compile_wgsl_missing_entry_point() {
        let result = compile_wgsl(TRIANGLE, naga::ShaderStage::Fragment, "vs_main");
        assert!(matches!(
            result,
            Err(GraphicsError::ShaderCompilationFailed(_))
        ));
    }

    #[test]
    fn test_compile_wgsl_parse_error() {
        let result = compile_wgsl("fn broken(", naga::ShaderStage::Vertex, "main");
        assert!(matches!(
            result,
            Err(GraphicsError::ShaderCompilationFailed(msg)) if msg.contains("parse")
        ));
    }
}
