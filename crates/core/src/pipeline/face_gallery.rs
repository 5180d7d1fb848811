use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detected_face::DetectedFace;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid gallery manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("face {id} has no stored crop")]
    MissingCrop { id: String },
    #[error("no face with id {id} in the gallery")]
    UnknownFace { id: String },
}

/// Append-only collection of faces found during a scan, in detection order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceGallery {
    faces: Vec<DetectedFace>,
}

impl FaceGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, face: DetectedFace) {
        self.faces.push(face);
    }

    pub fn extend(&mut self, faces: impl IntoIterator<Item = DetectedFace>) {
        self.faces.extend(faces);
    }

    pub fn clear(&mut self) {
        self.faces.clear();
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[DetectedFace] {
        &self.faces
    }

    /// Most recently added face.
    pub fn latest(&self) -> Option<&DetectedFace> {
        self.faces.last()
    }

    /// Writes the gallery as pretty-printed JSON, creating parent directories.
    pub fn save_manifest(&self, path: &Path) -> Result<(), GalleryError> {
        let io_err = |source| GalleryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| GalleryError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    pub fn load_manifest(path: &Path) -> Result<Self, GalleryError> {
        let json = std::fs::read_to_string(path).map_err(|source| GalleryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| GalleryError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Copies every stored crop into `dir` as `face_<timestamp>_<n>.png`,
    /// numbering faces by gallery position. Faces without a stored crop are
    /// skipped. Returns the written paths.
    pub fn export_all(&self, dir: &Path) -> Result<Vec<PathBuf>, GalleryError> {
        std::fs::create_dir_all(dir).map_err(|source| GalleryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::new();
        for (n, face) in self.faces.iter().enumerate() {
            let Some(source_path) = face.image_data.as_deref() else {
                continue;
            };
            let target = dir.join(export_file_name(face, n));
            std::fs::copy(source_path, &target).map_err(|source| GalleryError::Io {
                path: PathBuf::from(source_path),
                source,
            })?;
            written.push(target);
        }
        log::info!("exported {} faces to {}", written.len(), dir.display());
        Ok(written)
    }

    /// Face with the given id, if the gallery holds it.
    pub fn find(&self, id: &str) -> Option<&DetectedFace> {
        self.faces.iter().find(|face| face.id == id)
    }

    /// Exports the named faces one by one with [`export_one`]. Every id is
    /// looked up before anything is copied.
    pub fn export_selected(&self, ids: &[String], dir: &Path) -> Result<Vec<PathBuf>, GalleryError> {
        let selected = ids
            .iter()
            .map(|id| {
                self.find(id)
                    .ok_or_else(|| GalleryError::UnknownFace { id: id.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        selected.into_iter().map(|face| export_one(face, dir)).collect()
    }
}

/// Copies one face's crop into `dir` as `face_<timestamp>.png`.
///
/// Fails when the face has no stored crop or the copy fails.
pub fn export_one(face: &DetectedFace, dir: &Path) -> Result<PathBuf, GalleryError> {
    let Some(source_path) = face.image_data.as_deref() else {
        return Err(GalleryError::MissingCrop {
            id: face.id.clone(),
        });
    };
    std::fs::create_dir_all(dir).map_err(|source| GalleryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let target = dir.join(single_export_file_name(face));
    std::fs::copy(source_path, &target).map_err(|source| GalleryError::Io {
        path: PathBuf::from(source_path),
        source,
    })?;
    log::debug!("exported {} to {}", face.id, target.display());
    Ok(target)
}

/// File name for the `n`th face of a bulk export.
pub fn export_file_name(face: &DetectedFace, n: usize) -> String {
    format!("face_{}_{n}.png", portable_timestamp(face))
}

/// File name for a single exported face.
pub fn single_export_file_name(face: &DetectedFace) -> String {
    format!("face_{}.png", portable_timestamp(face))
}

/// The face's timestamp with `:` replaced, so it is a valid file name on
/// every platform.
fn portable_timestamp(face: &DetectedFace) -> String {
    face.timestamp.replace(':', "-")
}
