//! Per-level attribute transfer
//!
//! The simplifier reports, for each output face, the face of its input
//! that it descends from. Materials are looked up through that mapping.
//! Corner UVs need no lookup: surviving corners keep their coordinates and
//! corners moved by a collapse already took the retained vertex's UV.

use lowpoly_core::{Error, MaterialId, Result, TriangleMesh};
use lowpoly_simplification::DecimationConfig;

/// Which attribute channels survive onto a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub keep_uvs: bool,
    pub preserve_materials: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            keep_uvs: true,
            preserve_materials: true,
        }
    }
}

impl From<&DecimationConfig> for TransferOptions {
    fn from(config: &DecimationConfig) -> Self {
        Self {
            keep_uvs: config.keep_uvs,
            preserve_materials: config.preserve_materials,
        }
    }
}

/// Copy materials from `previous` onto `mesh` through `face_origin`, and
/// drop the channels `options` turns off.
///
/// `face_origin[i]` is the face of `previous` that face `i` of `mesh`
/// descends from.
pub fn transfer_attributes(
    previous: &TriangleMesh,
    mut mesh: TriangleMesh,
    face_origin: &[usize],
    options: TransferOptions,
) -> Result<TriangleMesh> {
    if face_origin.len() != mesh.face_count() {
        return Err(Error::Algorithm(format!(
            "{} face origins for {} faces",
            face_origin.len(),
            mesh.face_count()
        )));
    }
    mesh.materials = if options.preserve_materials {
        face_origin
            .iter()
            .map(|&f| {
                previous.materials.get(f).copied().ok_or_else(|| {
                    Error::Algorithm(format!("face origin {f} is not a face of the previous level"))
                })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        vec![MaterialId::default(); mesh.face_count()]
    };
    if !options.keep_uvs {
        mesh.uvs = None;
    }
    Ok(mesh)
}
