//! Caller-owned list of loaded images.

use std::fmt;

use imgload_codecs::DecodedImage;

/// Opaque handle to an image in an [`ImageCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered images with a current selection.
#[derive(Debug, Default)]
pub struct ImageCollection {
    images: Vec<(ImageId, DecodedImage)>,
    current: Option<ImageId>,
    next_id: u64,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ImageId {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn index_of(&self, id: ImageId) -> Option<usize> {
        self.images.iter().position(|(i, _)| *i == id)
    }

    pub fn get(&self, id: ImageId) -> Option<&DecodedImage> {
        self.images.iter().find(|(i, _)| *i == id).map(|(_, img)| img)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &DecodedImage)> {
        self.images.iter().map(|(id, img)| (*id, img))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ImageId, &mut DecodedImage)> {
        self.images.iter_mut().map(|(id, img)| (*id, img))
    }

    pub fn current(&self) -> Option<ImageId> {
        self.current
    }

    pub fn current_image(&self) -> Option<&DecodedImage> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: ImageId) -> bool {
        let found = self.index_of(id).is_some();
        if found {
            self.current = Some(id);
        }
        found
    }

    /// Take ownership of a delivered image.
    ///
    /// If `replace_target` is still present, the image takes its place under a
    /// fresh id; otherwise it is appended. Because the target id is retired on
    /// replacement, the remaining images of a multi-image reload are appended.
    pub fn accept(
        &mut self,
        image: DecodedImage,
        replace_target: Option<ImageId>,
        should_select: bool,
    ) -> ImageId {
        let id = self.allocate_id();
        match replace_target.and_then(|target| self.index_of(target)) {
            Some(index) => {
                let (old_id, old) = std::mem::replace(&mut self.images[index], (id, image));
                log::debug!("Replaced {} '{}' with {}", old_id, old.file_and_partname(), id);
                if self.current == Some(old_id) {
                    self.current = Some(id);
                }
            }
            None => self.images.push((id, image)),
        }
        if should_select || self.current.is_none() {
            self.current = Some(id);
        }
        id
    }

    /// Remove an image, moving the selection to a neighbour if needed.
    pub fn remove(&mut self, id: ImageId) -> Option<DecodedImage> {
        let index = self.index_of(id)?;
        let (_, image) = self.images.remove(index);
        if self.current == Some(id) {
            self.current = self
                .images
                .get(index)
                .or_else(|| self.images.last())
                .map(|(i, _)| *i);
        }
        Some(image)
    }
}
