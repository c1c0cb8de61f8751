use anyhow::Result;

/// Ticks arrive one at a time, a single thread is all the timer needs.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
