//! Repository seams for the enrolled gallery.

use crate::error::StoreError;
use crate::types::GalleryEntry;

/// Read access to the enrolled gallery.
pub trait GalleryReader {
    /// Point-in-time snapshot of every enrolled identity, in enrollment order.
    ///
    /// The returned vector is owned by the caller, so enrollments that land
    /// while a match is running are simply not seen by that match.
    fn load_gallery(&self) -> Result<Vec<GalleryEntry>, StoreError>;
}

/// Write access to the enrolled gallery.
pub trait GalleryWriter {
    /// Insert or replace the embedding enrolled for `entry.identity_id`.
    fn upsert(&self, entry: &GalleryEntry) -> Result<(), StoreError>;

    /// Remove an identity. Returns false if it was not enrolled.
    fn remove(&self, identity_id: &str) -> Result<bool, StoreError>;
}
