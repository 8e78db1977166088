/// Build script for DistXR
///
/// # Shader Compilation Strategy:
/// - D3D11: HLSL source is embedded with `include_str!` and compiled at runtime via D3DCompile
/// - Headless: the same source is only checked for entry points and input semantics
fn main() {
    // Trigger rebuild if shader files change
    println!("cargo:rerun-if-changed=src/gfx/shaders/cube.hlsl");
}
