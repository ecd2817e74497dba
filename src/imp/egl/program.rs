// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use super::context::Context;
use super::error::check_gl;
use super::texture::{GL_TEXTURE_EXTERNAL_OES, Texture};
use crate::images::ProgramError;
use crate::images::shader::{
    BACKGROUND_COORDS_ATTRIBUTE, BACKGROUND_SAMPLER, BACKGROUND_UNIT, FragmentShader, OVERLAY_COORDS_ATTRIBUTE,
    OVERLAY_SAMPLER, OVERLAY_UNIT, POSITION_ATTRIBUTE, VertexShader,
};
use crate::images::vertex_algorithms::Geometry;
use glow::HasContext;
use std::rc::Rc;

const QUAD_BYTES: i32 = 8 * size_of::<f32>() as i32;

fn compile(gl: &glow::Context, kind: u32, source: &str) -> Result<glow::Shader, ProgramError> {
    // SAFETY: current context
    unsafe {
        let shader = gl.create_shader(kind).map_err(ProgramError::Create)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            logwise::error_sync!(
                "Could not compile shader {kind}: {log}",
                kind = kind,
                log = logwise::privacy::LogIt(&log)
            );
            gl.delete_shader(shader);
            return Err(ProgramError::Compile { kind, log });
        }
        Ok(shader)
    }
}

type Locations = (u32, u32, u32, glow::UniformLocation, glow::UniformLocation);

fn locations(gl: &glow::Context, program: glow::Program) -> Result<Locations, ProgramError> {
    let attrib = |name: &'static str| {
        // SAFETY: current context, program is linked
        let location = unsafe { gl.get_attrib_location(program, name) };
        check_gl(gl, "glGetAttribLocation");
        location.ok_or(ProgramError::MissingAttribute(name))
    };
    let uniform = |name: &'static str| {
        // SAFETY: current context, program is linked
        let location = unsafe { gl.get_uniform_location(program, name) };
        check_gl(gl, "glGetUniformLocation");
        location.ok_or(ProgramError::MissingUniform(name))
    };
    Ok((
        attrib(POSITION_ATTRIBUTE)?,
        attrib(OVERLAY_COORDS_ATTRIBUTE)?,
        attrib(BACKGROUND_COORDS_ATTRIBUTE)?,
        uniform(OVERLAY_SAMPLER)?,
        uniform(BACKGROUND_SAMPLER)?,
    ))
}

/// The linked blend program, its attribute/uniform locations, and its vertex buffer.
#[derive(Debug)]
pub(crate) struct Program {
    context: Rc<Context>,
    program: glow::Program,
    buffer: glow::Buffer,
    position: u32,
    overlay_coords: u32,
    background_coords: u32,
    overlay_sampler: glow::UniformLocation,
    background_sampler: glow::UniformLocation,
}

impl Program {
    pub(crate) fn build(context: &Rc<Context>, vertex: &VertexShader, fragment: &FragmentShader) -> Result<Self, ProgramError> {
        let gl = &context.gl;
        let vs = compile(gl, glow::VERTEX_SHADER, vertex.glsl_code())?;
        let fs = match compile(gl, glow::FRAGMENT_SHADER, fragment.glsl_code()) {
            Ok(fs) => fs,
            Err(e) => {
                // SAFETY: current context
                unsafe { gl.delete_shader(vs) };
                return Err(e);
            }
        };
        // SAFETY: current context; shaders are live until deleted below
        unsafe {
            let program = match gl.create_program() {
                Ok(p) => p,
                Err(e) => {
                    gl.delete_shader(vs);
                    gl.delete_shader(fs);
                    return Err(ProgramError::Create(e));
                }
            };
            gl.attach_shader(program, vs);
            check_gl(gl, "glAttachShader");
            gl.attach_shader(program, fs);
            check_gl(gl, "glAttachShader");
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            if !linked {
                let log = gl.get_program_info_log(program);
                logwise::error_sync!("Could not link program: {log}", log = logwise::privacy::LogIt(&log));
                gl.delete_program(program);
                return Err(ProgramError::Link(log));
            }

            let (position, overlay_coords, background_coords, overlay_sampler, background_sampler) =
                match locations(gl, program) {
                    Ok(l) => l,
                    Err(e) => {
                        gl.delete_program(program);
                        return Err(e);
                    }
                };
            let buffer = match gl.create_buffer() {
                Ok(b) => b,
                Err(e) => {
                    gl.delete_program(program);
                    return Err(ProgramError::Create(e));
                }
            };
            logwise::trace_sync!(
                "program linked: position={position} osd={osd} bg={bg}",
                position = position,
                osd = overlay_coords,
                bg = background_coords
            );
            Ok(Program {
                context: context.clone(),
                program,
                buffer,
                position,
                overlay_coords,
                background_coords,
                overlay_sampler,
                background_sampler,
            })
        }
    }

    /**
    Draws the quad into `background`'s framebuffer.

    GL errors are logged after every call and never returned.
    */
    pub(crate) fn draw(&self, overlay: &Texture, background: &Texture, geometry: &Geometry) {
        let gl = &self.context.gl;
        let mut vertices = [0f32; 24];
        vertices[..8].copy_from_slice(&geometry.position.to_array());
        vertices[8..16].copy_from_slice(&geometry.overlay.to_array());
        vertices[16..].copy_from_slice(&geometry.background.to_array());
        // SAFETY: current context; every object used was created on it and is live
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, background.raw_framebuffer());
            check_gl(gl, "glBindFramebuffer");
            gl.viewport(0, 0, background.width() as i32, background.height() as i32);
            check_gl(gl, "glViewport");
            gl.use_program(Some(self.program));
            check_gl(gl, "glUseProgram");

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.buffer));
            check_gl(gl, "glBindBuffer");
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&vertices), glow::STREAM_DRAW);
            check_gl(gl, "glBufferData");
            for (index, attribute) in [self.position, self.overlay_coords, self.background_coords]
                .into_iter()
                .enumerate()
            {
                gl.vertex_attrib_pointer_f32(attribute, 2, glow::FLOAT, false, 0, index as i32 * QUAD_BYTES);
                check_gl(gl, "glVertexAttribPointer");
                gl.enable_vertex_attrib_array(attribute);
                check_gl(gl, "glEnableVertexAttribArray");
            }

            gl.active_texture(glow::TEXTURE0 + OVERLAY_UNIT);
            gl.bind_texture(GL_TEXTURE_EXTERNAL_OES, Some(overlay.raw_texture()));
            check_gl(gl, "glBindTexture");
            gl.uniform_1_i32(Some(&self.overlay_sampler), OVERLAY_UNIT as i32);
            check_gl(gl, "glUniform1i");

            gl.active_texture(glow::TEXTURE0 + BACKGROUND_UNIT);
            gl.bind_texture(GL_TEXTURE_EXTERNAL_OES, Some(background.raw_texture()));
            check_gl(gl, "glBindTexture");
            gl.uniform_1_i32(Some(&self.background_sampler), BACKGROUND_UNIT as i32);
            check_gl(gl, "glUniform1i");

            gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
            check_gl(gl, "glDrawArrays");
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        let gl = &self.context.gl;
        // SAFETY: current context
        unsafe {
            gl.delete_buffer(self.buffer);
            gl.delete_program(self.program);
        }
        check_gl(gl, "glDeleteProgram");
    }
}
