use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, instrument};

use crate::{tracker::entities::DayLog, utils::time::date_to_record_name};

/// Interface for abstracting storage of day logs. The aggregator only ever sees whole logs, how
/// they are kept is up to the implementation.
pub trait LogStorage {
    /// Loads the log of a day. A day that was never saved yields an empty log.
    fn load_day_log(&self, date: NaiveDate) -> impl Future<Output = Result<DayLog>>;

    /// Replaces the stored log of a day.
    fn save_day_log(&self, date: NaiveDate, log: &DayLog) -> impl Future<Output = Result<()>>;

    /// Loads the log of a day, applies `change` and stores the result without letting another
    /// writer in between. Returns the stored log.
    fn update_day_log<F>(&self, date: NaiveDate, change: F) -> impl Future<Output = Result<DayLog>>
    where
        F: FnOnce(&mut DayLog);
}

impl<T: Deref> LogStorage for T
where
    T::Target: LogStorage,
{
    fn load_day_log(&self, date: NaiveDate) -> impl Future<Output = Result<DayLog>> {
        self.deref().load_day_log(date)
    }

    fn save_day_log(&self, date: NaiveDate, log: &DayLog) -> impl Future<Output = Result<()>> {
        self.deref().save_day_log(date, log)
    }

    fn update_day_log<F>(&self, date: NaiveDate, change: F) -> impl Future<Output = Result<DayLog>>
    where
        F: FnOnce(&mut DayLog),
    {
        self.deref().update_day_log(date, change)
    }
}

/// The main realization of [LogStorage]. Every day is a json file named after the date.
pub struct LogStorageImpl {
    record_dir: PathBuf,
}

impl LogStorageImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.record_dir
            .join(format!("{}.json", date_to_record_name(date)))
    }

    async fn read_locked(file: &mut File) -> Result<String, std::io::Error> {
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    async fn write_locked(file: &mut File, contents: &[u8]) -> Result<(), std::io::Error> {
        // Truncation happens under the lock so readers never see a half written log.
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(contents).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_inner(path: &Path) -> Result<DayLog> {
        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No log at {path:?}, starting empty");
                return Ok(DayLog::default());
            }
            Err(e) => return Err(e).with_context(|| format!("Can't open day log {path:?}")),
        };

        file.lock_shared()?;
        let contents = Self::read_locked(&mut file).await;
        file.unlock_async().await?;
        let contents = contents.with_context(|| format!("Can't read day log {path:?}"))?;

        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<DayLog> {
        // Might be left behind if the process dies between truncating and writing.
        if contents.trim().is_empty() {
            return Ok(DayLog::default());
        }

        serde_json::from_str(contents).with_context(|| format!("Corrupted day log {path:?}"))
    }

    async fn open_for_writing(path: &Path) -> Result<File> {
        File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await
            .with_context(|| format!("Can't open day log {path:?} for writing"))
    }

    async fn update_locked<F>(file: &mut File, path: &Path, change: F) -> Result<DayLog>
    where
        F: FnOnce(&mut DayLog),
    {
        let contents = Self::read_locked(file)
            .await
            .with_context(|| format!("Can't read day log {path:?}"))?;
        let mut log = Self::parse(&contents, path)?;
        change(&mut log);
        Self::write_locked(file, &serde_json::to_vec_pretty(&log)?)
            .await
            .with_context(|| format!("Can't write day log {path:?}"))?;
        Ok(log)
    }
}

impl LogStorage for LogStorageImpl {
    #[instrument(skip(self))]
    async fn load_day_log(&self, date: NaiveDate) -> Result<DayLog> {
        Self::load_inner(&self.path_for(date)).await
    }

    #[instrument(skip(self, log))]
    async fn save_day_log(&self, date: NaiveDate, log: &DayLog) -> Result<()> {
        let path = self.path_for(date);
        let contents = serde_json::to_vec_pretty(log)?;

        let mut file = Self::open_for_writing(&path).await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::write_locked(&mut file, &contents).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Can't write day log {path:?}"))?;

        debug!("Saved {} sessions into {path:?}", log.sessions.len());
        Ok(())
    }

    #[instrument(skip(self, change))]
    async fn update_day_log<F>(&self, date: NaiveDate, change: F) -> Result<DayLog>
    where
        F: FnOnce(&mut DayLog),
    {
        let path = self.path_for(date);
        let mut file = Self::open_for_writing(&path).await?;

        // Read and write happen under one lock, a concurrent save can't slip in between.
        file.lock_exclusive()?;
        let result = Self::update_locked(&mut file, &path, change).await;
        file.unlock_async().await?;

        let log = result?;
        debug!("Updated {path:?}, {} sessions", log.sessions.len());
        Ok(log)
    }
}

#[cfg(test)]
pub mod memory {
    use std::{collections::HashMap, sync::Mutex};

    use anyhow::{bail, Result};
    use chrono::NaiveDate;

    use super::LogStorage;
    use crate::tracker::entities::DayLog;

    /// Keeps logs in memory and counts saves. Used where file I/O would get in the way of paused
    /// tokio time.
    #[derive(Default)]
    pub struct MemoryLogStorage {
        pub logs: Mutex<HashMap<NaiveDate, DayLog>>,
        pub saves: Mutex<usize>,
        pub broken: Mutex<Vec<NaiveDate>>,
    }

    impl MemoryLogStorage {
        pub fn log(&self, date: NaiveDate) -> Option<DayLog> {
            self.logs.lock().unwrap().get(&date).cloned()
        }

        pub fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    impl LogStorage for MemoryLogStorage {
        async fn load_day_log(&self, date: NaiveDate) -> Result<DayLog> {
            if self.broken.lock().unwrap().contains(&date) {
                bail!("Log for {date} is unreadable");
            }
            Ok(self.log(date).unwrap_or_default())
        }

        async fn save_day_log(&self, date: NaiveDate, log: &DayLog) -> Result<()> {
            *self.saves.lock().unwrap() += 1;
            self.logs.lock().unwrap().insert(date, log.clone());
            Ok(())
        }

        async fn update_day_log<F>(&self, date: NaiveDate, change: F) -> Result<DayLog>
        where
            F: FnOnce(&mut DayLog),
        {
            let mut log = self.load_day_log(date).await?;
            change(&mut log);
            self.save_day_log(date, &log).await?;
            Ok(log)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    use super::{LogStorage, LogStorageImpl};
    use crate::tracker::{
        accumulator::record_tick,
        entities::{Category, Color, DayLog},
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn sample_log() -> DayLog {
        let mut log = DayLog::default();
        let categories = ["writing", "reading"].map(|name| Category {
            id: name.into(),
            name: name.into(),
            color: Color::rgb(0x12, 0x34, 0x56),
        });
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        for t in 0..90 {
            record_tick(&mut log, &categories[1], start + Duration::seconds(t));
        }
        for t in 90..100 {
            record_tick(&mut log, &categories[0], start + Duration::seconds(t));
        }
        log.note = json!({ "blocks": [{ "type": "text", "text": "done" }] });
        log
    }

    #[tokio::test]
    async fn test_missing_day_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;
        let log = storage.load_day_log(TEST_START_DATE.date()).await?;
        assert!(log.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;
        let log = sample_log();

        storage.save_day_log(TEST_START_DATE.date(), &log).await?;
        let loaded = storage.load_day_log(TEST_START_DATE.date()).await?;

        assert_eq!(loaded, log);
        // "reading" was recorded first and has to stay first.
        assert_eq!(
            loaded.totals.iter().next().map(|(id, _)| id.as_str()),
            Some("reading")
        );
        assert!(dir.path().join("2018-07-04.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites_longer_content() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;

        storage
            .save_day_log(TEST_START_DATE.date(), &sample_log())
            .await?;
        storage
            .save_day_log(TEST_START_DATE.date(), &DayLog::default())
            .await?;

        let loaded = storage.load_day_log(TEST_START_DATE.date()).await?;
        assert!(loaded.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_log_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("2018-07-04.json"), "{ \"sessions\": [")?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;

        let result = storage.load_day_log(TEST_START_DATE.date()).await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_log() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("2018-07-04.json"), "")?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;

        assert!(storage.load_day_log(TEST_START_DATE.date()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_what_it_doesnt_change() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;
        let date = TEST_START_DATE.date();
        storage.save_day_log(date, &sample_log()).await?;

        let updated = storage
            .update_day_log(date, |log| log.note = json!("rewritten"))
            .await?;

        let loaded = storage.load_day_log(date).await?;
        assert_eq!(loaded, updated);
        assert_eq!(loaded.sessions, sample_log().sessions);
        assert_eq!(loaded.totals, sample_log().totals);
        assert_eq!(loaded.note, json!("rewritten"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_of_missing_day_creates_it() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;
        let date = TEST_START_DATE.date();

        storage
            .update_day_log(date, |log| log.note = json!("first"))
            .await?;
        assert_eq!(storage.load_day_log(date).await?.note, json!("first"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_leaves_corrupted_log_alone() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("2018-07-04.json");
        std::fs::write(&path, "{ \"sessions\": [")?;
        let storage = LogStorageImpl::new(dir.path().to_owned())?;

        let result = storage
            .update_day_log(TEST_START_DATE.date(), |log| log.note = json!("lost"))
            .await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path)?, "{ \"sessions\": [");
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_behind_pointer() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(LogStorageImpl::new(dir.path().to_owned())?);
        storage
            .save_day_log(TEST_START_DATE.date(), &sample_log())
            .await?;
        assert_eq!(
            storage.load_day_log(TEST_START_DATE.date()).await?,
            sample_log()
        );
        Ok(())
    }
}
