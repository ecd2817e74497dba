/*!
Shader sources for the two-layer compositor.

The fragment shader samples both layers through `GL_EXT_YUV_target` external samplers, so YUV
layers arrive as raw Y/U/V and RGB layers as RGBA.  The overlay is converted into the
background's YUV space with `rgb_2_yuv` and blended by its own alpha.
*/

/// The color conversion standards `GL_EXT_YUV_target` defines for `rgb_2_yuv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum YuvStandard {
    /// BT.601, limited range.
    #[default]
    Itu601,
    Itu601FullRange,
    /// BT.709, limited range.
    Itu709,
}

impl YuvStandard {
    /// Name of the `yuvCscStandardEXT` constant.
    pub const fn glsl_name(self) -> &'static str {
        match self {
            YuvStandard::Itu601 => "itu_601",
            YuvStandard::Itu601FullRange => "itu_601_full_range",
            YuvStandard::Itu709 => "itu_709",
        }
    }

    /// `rgb_2_yuv` on normalized components.
    pub fn rgb_to_yuv(self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        const OFFSET_16: f32 = 16.0 / 255.0;
        const OFFSET_128: f32 = 128.0 / 255.0;
        match self {
            YuvStandard::Itu601 => [
                0.256788 * r + 0.504129 * g + 0.097906 * b + OFFSET_16,
                -0.148223 * r - 0.290993 * g + 0.439216 * b + OFFSET_128,
                0.439216 * r - 0.367788 * g - 0.071427 * b + OFFSET_128,
            ],
            YuvStandard::Itu601FullRange => [
                0.299 * r + 0.587 * g + 0.114 * b,
                -0.168736 * r - 0.331264 * g + 0.5 * b + 0.5,
                0.5 * r - 0.418688 * g - 0.081312 * b + 0.5,
            ],
            YuvStandard::Itu709 => [
                0.182586 * r + 0.614231 * g + 0.062007 * b + OFFSET_16,
                -0.100644 * r - 0.338572 * g + 0.439216 * b + OFFSET_128,
                0.439216 * r - 0.398942 * g - 0.040274 * b + OFFSET_128,
            ],
        }
    }
}

#[derive(Debug)]
pub struct FragmentShader {
    pub(crate) glsl_code: String,
}

#[derive(Debug)]
pub struct VertexShader {
    pub(crate) glsl_code: String,
}

impl FragmentShader {
    pub fn new(glsl_code: String) -> Self {
        Self { glsl_code }
    }

    /// The blend shader, converting with `standard`.
    pub fn composite(standard: YuvStandard) -> Self {
        Self::new(format!(
            "#version 310 es
#extension GL_OES_EGL_image_external : require
#extension GL_EXT_YUV_target : require
precision mediump float;
uniform __samplerExternal2DY2YEXT {overlay};
uniform __samplerExternal2DY2YEXT {background};
yuvCscStandardEXT conv_standard = {standard};
in vec2 osdTexCoords;
in vec2 bgTexCoords;
out vec4 FragColor;
void main() {{
    vec4 osdColor = texture({overlay}, osdTexCoords);
    vec3 osdColorYuv = rgb_2_yuv(osdColor.xyz, conv_standard);
    vec4 bgColor = texture({background}, bgTexCoords);
    FragColor = vec4(bgColor.xyz * (1.0 - osdColor.a) + osdColorYuv * osdColor.a, 1.0);
}}
",
            overlay = OVERLAY_SAMPLER,
            background = BACKGROUND_SAMPLER,
            standard = standard.glsl_name(),
        ))
    }

    pub fn glsl_code(&self) -> &str {
        &self.glsl_code
    }
}

impl VertexShader {
    pub fn new(glsl_code: String) -> Self {
        Self { glsl_code }
    }

    /// Passes position and both texture coordinate sets through.
    pub fn composite() -> Self {
        Self::new(format!(
            "#version 310 es
in vec4 {position};
in vec2 {overlay};
in vec2 {background};
out vec2 osdTexCoords;
out vec2 bgTexCoords;
void main() {{
    osdTexCoords = {overlay};
    bgTexCoords = {background};
    gl_Position = {position};
}}
",
            position = POSITION_ATTRIBUTE,
            overlay = OVERLAY_COORDS_ATTRIBUTE,
            background = BACKGROUND_COORDS_ATTRIBUTE,
        ))
    }

    pub fn glsl_code(&self) -> &str {
        &self.glsl_code
    }
}

pub(crate) const POSITION_ATTRIBUTE: &str = "vPosition";
pub(crate) const OVERLAY_COORDS_ATTRIBUTE: &str = "osdtexCoords";
pub(crate) const BACKGROUND_COORDS_ATTRIBUTE: &str = "bgtexCoords";
pub(crate) const OVERLAY_SAMPLER: &str = "osdTexture";
pub(crate) const BACKGROUND_SAMPLER: &str = "bgTexture";
///texture unit of the overlay; the background uses the next one
#[cfg(feature = "backend_egl")]
pub(crate) const OVERLAY_UNIT: u32 = 0;
#[cfg(feature = "backend_egl")]
pub(crate) const BACKGROUND_UNIT: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_is_spliced() {
        let f = FragmentShader::composite(YuvStandard::Itu709);
        assert!(f.glsl_code().contains("yuvCscStandardEXT conv_standard = itu_709;"));
        assert!(f.glsl_code().contains("uniform __samplerExternal2DY2YEXT osdTexture;"));
        let v = VertexShader::composite();
        assert!(v.glsl_code().starts_with("#version 310 es"));
        assert!(v.glsl_code().contains("in vec2 bgtexCoords;"));
    }

    #[test]
    fn black_and_white_limited_range() {
        let [y, u, v] = YuvStandard::Itu601.rgb_to_yuv([0.0, 0.0, 0.0]);
        assert!((y * 255.0 - 16.0).abs() < 0.01);
        assert!((u * 255.0 - 128.0).abs() < 0.01);
        assert!((v * 255.0 - 128.0).abs() < 0.01);
        let [y, _, _] = YuvStandard::Itu601.rgb_to_yuv([1.0, 1.0, 1.0]);
        assert!((y * 255.0 - 235.0).abs() < 0.05);
        let [y, u, v] = YuvStandard::Itu601FullRange.rgb_to_yuv([1.0, 1.0, 1.0]);
        assert!((y - 1.0).abs() < 1e-5 && (u - 0.5).abs() < 1e-5 && (v - 0.5).abs() < 1e-5);
    }
}
