//! Positive and negative training image sets.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::error::{DecodeError, ProjectError};
use crate::image::{ImageKey, ImageSource, PendingUpload, ServerImage, TrainingImage, TrainingImageRecord};
use crate::snapshot::ImageSetRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKind {
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct TrainingImageSet {
    kind: SetKind,
    images: Vec<TrainingImage>,
}

impl TrainingImageSet {
    pub fn new(kind: SetKind) -> Self {
        TrainingImageSet {
            kind,
            images: Vec::new(),
        }
    }

    pub fn from_record(kind: SetKind, record: &ImageSetRecord) -> Result<Self, DecodeError> {
        let images = record
            .images
            .iter()
            .map(|image| {
                image.validate()?;
                Ok(TrainingImage::from_record(image))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;
        Ok(TrainingImageSet { kind, images })
    }

    /// Only uploaded images are persisted.
    pub fn record(&self) -> ImageSetRecord {
        ImageSetRecord::new(self.images.iter().filter_map(TrainingImage::record).collect())
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    pub fn images(&self) -> &[TrainingImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn uploaded_count(&self) -> usize {
        self.images.iter().filter(|i| i.is_uploaded()).count()
    }

    pub fn enabled_count(&self) -> usize {
        self.images.iter().filter(|i| i.enabled).count()
    }

    pub fn get(&self, key: ImageKey) -> Option<&TrainingImage> {
        self.images.iter().find(|i| i.key() == key)
    }

    pub(crate) fn get_mut(&mut self, key: ImageKey) -> Option<&mut TrainingImage> {
        self.images.iter_mut().find(|i| i.key() == key)
    }

    /// Server-side records of every uploaded image, in set order.
    pub fn server_records(&self) -> Vec<TrainingImageRecord> {
        self.images.iter().filter_map(TrainingImage::record).collect()
    }

    pub fn add_images(&mut self, images: Vec<TrainingImage>, at_front: bool) {
        if at_front {
            self.images.splice(0..0, images);
        } else {
            self.images.extend(images);
        }
    }

    pub fn remove_image(&mut self, key: ImageKey) -> Option<TrainingImage> {
        let index = self.images.iter().position(|i| i.key() == key)?;
        Some(self.images.remove(index))
    }

    pub fn set_weight(&mut self, key: ImageKey, weight: u32) -> bool {
        match self.get_mut(key) {
            Some(image) => {
                image.weight = weight;
                true
            }
            None => false,
        }
    }

    /// Mark an uploading entry as in flight, returning its pending state.
    ///
    /// `None` when the entry is gone, already on the server, or already
    /// uploading.
    pub(crate) fn begin_upload(&mut self, key: ImageKey) -> Option<PendingUpload> {
        match &mut self.get_mut(key)?.source {
            ImageSource::Uploading(upload) if !upload.is_uploading => {
                upload.is_uploading = true;
                upload.error_description = None;
                Some(upload.clone())
            }
            _ => None,
        }
    }

    /// Swap an uploading entry for its server image, keeping key, weight and
    /// enabled flag. Returns whether the entry was still present.
    pub(crate) fn finish_upload(&mut self, key: ImageKey, image: ServerImage) -> bool {
        match self.get_mut(key) {
            Some(entry) if !entry.is_uploaded() => {
                entry.source = ImageSource::Server(image);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn fail_upload(&mut self, key: ImageKey, description: String) {
        if let Some(entry) = self.get_mut(key) {
            if let ImageSource::Uploading(upload) = &mut entry.source {
                upload.is_uploading = false;
                upload.error_description = Some(description);
            }
        }
    }

    /// Resize to exactly `desired_count` enabled images.
    ///
    /// User-generated images sort first, and within them enabled ones first.
    /// Shrinking disables the last enabled user image rather than deleting it;
    /// scout images are removed outright. Growing pulls random scout images
    /// not already in the set, repeating images only once the dataset is used
    /// up.
    pub fn adjust_size_using_scout_images<R: Rng + ?Sized>(
        &mut self,
        desired_count: i64,
        scout_images: &[TrainingImageRecord],
        rng: &mut R,
    ) -> Result<(), ProjectError> {
        if desired_count < 0 {
            return Err(ProjectError::InvalidDesiredCount(desired_count));
        }
        let desired = desired_count as usize;

        self.images
            .sort_by_key(|image| (!image.user_generated(), !image.enabled));

        loop {
            let enabled = self.enabled_count();

            if enabled > desired {
                let Some(index) = self.images.iter().rposition(|i| i.enabled) else {
                    break;
                };
                if self.images[index].user_generated() {
                    self.images[index].enabled = false;
                } else {
                    self.images.remove(index);
                }
            } else if enabled < desired {
                let mut candidates: Vec<&TrainingImageRecord> = scout_images
                    .iter()
                    .filter(|scout| !self.contains_server_image(&scout.id))
                    .collect();

                if candidates.is_empty() {
                    warn!(set = ?self.kind, "ran out of scout images, allowing repeats");
                    candidates = scout_images.iter().collect();
                }

                let Some(scout) = candidates.choose(rng) else {
                    return Err(ProjectError::ScoutImagesExhausted);
                };
                let mut image = TrainingImage::from_record(scout);
                image.enabled = true;
                self.images.push(image);
            } else {
                break;
            }
        }

        Ok(())
    }

    fn contains_server_image(&self, id: &str) -> bool {
        self.images
            .iter()
            .any(|i| i.server_image().is_some_and(|s| s.id == id))
    }
}
