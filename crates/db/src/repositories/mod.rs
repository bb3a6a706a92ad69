pub mod orphan_repo;
pub mod user_repo;
pub mod video_repo;

pub use orphan_repo::OrphanRepo;
pub use user_repo::UserRepo;
pub use video_repo::VideoRepo;
