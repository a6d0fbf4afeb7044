use bytemuck::NoUninit;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Open cone pointing up the +y axis, apex on top, plus a base cap.
/// Enemies use radius 1, height 3, 8 segments.
pub fn create_cone_mesh(radius: f32, height: f32, segments: u32, color: [f32; 4]) -> Mesh {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let half = height / 2.0;

    // Apex
    vertices.push(Vertex {
        pos: [0.0, half, 0.0],
        normal: [0.0, 1.0, 0.0],
        color,
        uv: [0.5, 0.0],
    });

    // Rim of the base circle. Side normals lean out by the slope angle.
    let slope = (radius / height).atan();
    for s in 0..=segments {
        let theta = s as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        vertices.push(Vertex {
            pos: [radius * cos, -half, radius * sin],
            normal: [
                cos * slope.cos(),
                slope.sin(),
                sin * slope.cos(),
            ],
            color,
            uv: [s as f32 / segments as f32, 1.0],
        });
    }

    // Sides
    for s in 0..segments {
        indices.extend_from_slice(&[0, 1 + s + 1, 1 + s]);
    }

    // Base cap around a center vertex
    let center = vertices.len() as u32;
    vertices.push(Vertex {
        pos: [0.0, -half, 0.0],
        normal: [0.0, -1.0, 0.0],
        color,
        uv: [0.5, 0.5],
    });
    for s in 0..segments {
        indices.extend_from_slice(&[center, 1 + s, 1 + s + 1]);
    }

    Mesh { vertices, indices }
}

/// UV sphere. `inward` flips the winding and the normals so the mesh can be
/// viewed from inside - the starfield is an inward sphere of radius 500.
pub fn create_sphere_mesh(
    radius: f32,
    sectors: u32,
    stacks: u32,
    color: [f32; 4],
    inward: bool,
) -> Mesh {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for stack in 0..=stacks {
        let phi = stack as f32 / stacks as f32 * std::f32::consts::PI;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for sector in 0..=sectors {
            let theta = sector as f32 / sectors as f32 * std::f32::consts::TAU;
            let (sin_theta, cos_theta) = theta.sin_cos();

            let dir = [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta];
            let flip = if inward { -1.0 } else { 1.0 };
            vertices.push(Vertex {
                pos: [dir[0] * radius, dir[1] * radius, dir[2] * radius],
                normal: [dir[0] * flip, dir[1] * flip, dir[2] * flip],
                color,
                uv: [
                    sector as f32 / sectors as f32,
                    stack as f32 / stacks as f32,
                ],
            });
        }
    }

    let ring = sectors + 1;
    for stack in 0..stacks {
        for sector in 0..sectors {
            let a = stack * ring + sector;
            let b = a + ring;
            if inward {
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            } else {
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
    }

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cone_has_expected_counts() {
        let mesh = create_cone_mesh(1.0, 3.0, 8, [1.0, 0.0, 0.0, 1.0]);
        // apex + 9 rim + base center
        assert_eq!(mesh.vertices.len(), 11);
        // 8 side + 8 cap triangles
        assert_eq!(mesh.indices.len(), 16 * 3);
        let max = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < max));
    }

    #[test]
    fn sphere_indices_stay_in_bounds() {
        let mesh = create_sphere_mesh(0.1, 8, 8, [1.0, 0.0, 0.0, 1.0], false);
        assert_eq!(mesh.vertices.len(), 9 * 9);
        assert_eq!(mesh.indices.len() as u32, 8 * 8 * 6);
        let max = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < max));
    }

    #[test]
    fn inward_sphere_normals_point_at_center() {
        let mesh = create_sphere_mesh(500.0, 4, 4, [1.0; 4], true);
        for v in &mesh.vertices {
            let dot = v.pos[0] * v.normal[0] + v.pos[1] * v.normal[1] + v.pos[2] * v.normal[2];
            assert!(dot <= 0.0);
        }
    }
}
