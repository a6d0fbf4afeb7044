//! Asset loading: the ship model (glTF binary) and the starfield texture.
//!
//! Loads are fire-and-forget from the game's point of view: a failed ship
//! load leaves the ship absent forever (movement and look stay disabled),
//! a failed starfield load keeps the flat fallback backdrop. Unlike the
//! original, failures are logged.

use thiserror::Error;

use crate::utils::{Mesh, Vertex};

pub const SHIP_MODEL_URL: &str = "https://example.com/spaceship.glb";
pub const STARFIELD_URL: &str = "https://example.com/starfield.jpg";

#[cfg(not(target_arch = "wasm32"))]
pub const SHIP_MODEL_PATH: &str = "assets/spaceship.glb";
#[cfg(not(target_arch = "wasm32"))]
pub const STARFIELD_PATH: &str = "assets/starfield.jpg";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("glTF parse failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("model contains no triangle geometry")]
    EmptyModel,
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[cfg(not(target_arch = "wasm32"))]
    #[error("asset read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Flatten every primitive of the glTF document into one mesh, colored by
/// each primitive's base color factor.
pub fn decode_ship_mesh(bytes: &[u8]) -> Result<Mesh, AssetError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;

    let mut mesh = Mesh::empty();
    for gltf_mesh in document.meshes() {
        for primitive in gltf_mesh.primitives() {
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };

            let base = mesh.vertices.len() as u32;
            let color = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            for (i, pos) in positions.enumerate() {
                mesh.vertices.push(Vertex {
                    pos,
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    color,
                    uv: [0.0, 0.0],
                });
            }

            match reader.read_indices() {
                Some(indices) => mesh
                    .indices
                    .extend(indices.into_u32().map(|i| base + i)),
                // Non-indexed primitive: consecutive triangles
                None => mesh.indices.extend(base..mesh.vertices.len() as u32),
            }
        }
    }

    if mesh.is_empty() {
        return Err(AssetError::EmptyModel);
    }
    Ok(mesh)
}

/// Decode the starfield image to tightly packed RGBA8.
pub fn decode_starfield_rgba(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), AssetError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    Ok((image.into_raw(), width, height))
}

#[cfg(target_arch = "wasm32")]
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, wasm_bindgen::JsValue> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global `window`"))?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!(
            "HTTP {} fetching {url}",
            response.status()
        )));
    }
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_model_bytes_are_rejected() {
        assert!(decode_ship_mesh(b"definitely not a gltf file").is_err());
    }

    #[test]
    fn garbage_image_bytes_are_rejected() {
        assert!(decode_starfield_rgba(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }

    #[test]
    fn png_round_trips_to_rgba() {
        let mut encoded = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        img.write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .unwrap();

        let (pixels, width, height) = decode_starfield_rgba(&encoded).unwrap();
        assert_eq!((width, height), (2, 3));
        assert_eq!(pixels.len(), 2 * 3 * 4);
        assert_eq!(&pixels[..4], &[10, 20, 30, 255]);
    }
}
