// Saved designs: persistence, image storage and public sharing.
// Everything here is scoped to the authenticated owner except the shared-token read.

pub mod handlers;
pub mod repository;
pub mod share;
pub mod storage;
