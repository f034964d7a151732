pub mod poi_fetcher;

pub use poi_fetcher::{ensure_save_dir, FetchedFile, PoiFetcher};
