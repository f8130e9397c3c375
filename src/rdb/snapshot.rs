use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use itertools::Itertools;
use tracing::{debug, info, instrument};

use super::{opcode, ObjectDumper, ObjectLoader, RdbError, MAGIC, RDB_VERSION, REDIS_VER};
use crate::db::DatabaseManager;
use crate::error::{StoreError, StoreResult};
use crate::keyspace::{Keyspace, Value};

/// Default snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "dump.rdb";

/// The first format version whose files end with a checksum.
const FIRST_CHECKSUMMED_VERSION: u16 = 5;

/// Writes every database of `manager` as one snapshot, keys sorted by name.
pub fn save_snapshot<W: Write>(manager: &Arc<DatabaseManager>, writer: W) -> StoreResult<W> {
    let mut dumper = ObjectDumper::new(writer);
    dumper.write_header()?;
    dumper.write_aux(b"redis-ver", REDIS_VER.as_bytes())?;
    dumper.write_aux(b"redis-bits", b"64")?;

    let mut keyspace = Keyspace::new(manager.clone());
    for index in 0..manager.count() {
        keyspace.select(index as i64)?;

        let names = keyspace.keys(b"*")?.into_iter().sorted().collect_vec();
        if names.is_empty() {
            continue;
        }

        dumper.write_u8(opcode::SELECTDB)?;
        dumper.write_length(index as u64)?;
        dumper.write_u8(opcode::RESIZEDB)?;
        dumper.write_length(names.len() as u64)?;
        dumper.write_length(0)?;

        for name in names {
            // Deleted since it was listed.
            let Some(value) = keyspace.value(&name)? else {
                continue;
            };

            dumper.write_object_type(&value)?;
            dumper.write_string(&name)?;
            dumper.write_object(&value)?;
        }
    }

    dumper.write_u8(opcode::EOF)?;
    let crc = dumper.crc();
    let mut writer = dumper.into_inner();
    writer.write_all(&crc.to_le_bytes()).map_err(RdbError::from)?;

    Ok(writer)
}

/// Reads a snapshot into `manager`, returning how many keys it held.
///
/// The whole file is decoded and its checksum verified before any key is
/// written. Keys that already exist are replaced.
pub fn load_snapshot<R: Read>(manager: &Arc<DatabaseManager>, reader: R) -> StoreResult<usize> {
    let mut loader = ObjectLoader::new(reader);

    let magic = loader.read_bytes(MAGIC.len() as u64)?;
    if magic != MAGIC {
        return Err(RdbError::BadMagic.into());
    }

    let version = loader.read_bytes(4)?;
    let version = match std::str::from_utf8(&version).ok().and_then(|v| v.parse::<u16>().ok()) {
        Some(version) if (1..=RDB_VERSION).contains(&version) => version,
        Some(version) => return Err(RdbError::UnsupportedVersion(version.to_string()).into()),
        None => {
            let version = String::from_utf8_lossy(&version).into_owned();
            return Err(RdbError::UnsupportedVersion(version).into());
        }
    };

    let mut entries: Vec<(usize, Bytes, Value)> = Vec::new();
    let mut database = 0;
    loop {
        match loader.read_u8()? {
            opcode::AUX => {
                let key = loader.read_string()?;
                let value = loader.read_string()?;
                debug!(
                    key = %String::from_utf8_lossy(&key),
                    value = %String::from_utf8_lossy(&value),
                    "snapshot aux field"
                );
            }
            opcode::RESIZEDB => {
                loader.read_length()?;
                loader.read_length()?;
            }
            // Expiry is not supported; the key that follows is loaded as is.
            opcode::EXPIRETIME_MS => {
                loader.read_bytes(8)?;
            }
            opcode::EXPIRETIME => {
                loader.read_bytes(4)?;
            }
            opcode::SELECTDB => database = loader.read_length()? as usize,
            opcode::EOF => break,
            object_type => {
                let name = Bytes::from(loader.read_string()?);
                let value = loader.read_object(object_type)?;
                entries.push((database, name, value));
            }
        }
    }

    if version >= FIRST_CHECKSUMMED_VERSION {
        let computed = loader.crc();
        let expected = loader.read_checksum()?;
        // A zero checksum means the writer had checksums turned off.
        if expected != 0 && expected != computed {
            return Err(RdbError::ChecksumMismatch { expected, computed }.into());
        }
    }

    if entries.iter().any(|(database, _, _)| *database >= manager.count()) {
        return Err(StoreError::DbIndexOutOfRange);
    }

    let mut keyspace = Keyspace::new(manager.clone());
    let loaded = entries.len();
    for (database, name, value) in entries {
        keyspace.select(database as i64)?;
        keyspace.replace(&name, &value)?;
    }

    Ok(loaded)
}

/// Saves a snapshot to `path`, replacing it atomically.
#[instrument(skip(manager))]
pub fn save_to_file(manager: &Arc<DatabaseManager>, path: &Path) -> StoreResult<()> {
    let temp_path = path.with_extension("rdb.tmp");

    let write = || -> StoreResult<()> {
        let file = File::create(&temp_path).map_err(RdbError::from)?;
        let writer = save_snapshot(manager, BufWriter::new(file))?;
        let file = writer
            .into_inner()
            .map_err(|err| RdbError::from(err.into_error()))?;
        file.sync_all().map_err(RdbError::from)?;
        Ok(())
    };

    if let Err(err) = write() {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, path).map_err(RdbError::from)?;
    info!("snapshot saved");

    Ok(())
}

#[instrument(skip(manager))]
pub fn load_from_file(manager: &Arc<DatabaseManager>, path: &Path) -> StoreResult<usize> {
    let file = File::open(path).map_err(RdbError::from)?;
    let loaded = load_snapshot(manager, BufReader::new(file))?;
    info!(keys = loaded, "snapshot loaded");

    Ok(loaded)
}
