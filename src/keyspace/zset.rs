use std::collections::BTreeMap;
use std::str::FromStr;

use bytes::Bytes;
use itertools::Itertools;

use super::{find_object, load_container, stage_delete, Container, Keyspace};
use crate::backend::{StorageBackend, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::float_codec;
use crate::key_codec::{self, KeyCodecError, KeyKind};

/// One end of a score range.
///
/// Parses the `ZRANGEBYSCORE` syntax: a number, `-inf`, `+inf` or `inf`,
/// optionally prefixed with `(` to exclude the bound itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    pub value: f64,
    pub exclusive: bool,
}

impl ScoreBound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }

    fn admits_as_min(&self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    fn admits_as_max(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

impl FromStr for ScoreBound {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (exclusive, literal) = match s.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let value = match literal.to_ascii_lowercase().as_str() {
            "-inf" => f64::NEG_INFINITY,
            "+inf" | "inf" => f64::INFINITY,
            other => other.parse::<f64>().map_err(|_| StoreError::NotFloat)?,
        };
        if value.is_nan() {
            return Err(StoreError::NotFloat);
        }

        Ok(Self { value, exclusive })
    }
}

fn decode_score(raw: &[u8]) -> StoreResult<f64> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| KeyCodecError::MalformedScore)?;
    Ok(f64::from_be_bytes(bytes))
}

/// Splits a score key found under `prefix` into member and score.
fn score_entry(prefix: &[u8], key: &[u8]) -> StoreResult<(Bytes, f64)> {
    let (score, member) = key_codec::split_score(&key[prefix.len()..])?;
    Ok((Bytes::copy_from_slice(member), score))
}

/// Every `(member, score)` of a sorted set, in ascending score order.
fn zset_entries(db: &dyn StorageBackend, container: &Container) -> StoreResult<Vec<(Bytes, f64)>> {
    let prefix = container.component_prefix(KeyKind::ZSetScore);
    db.iterate(&prefix, None)
        .map(|entry| -> StoreResult<(Bytes, f64)> {
            let (key, _) = entry?;
            score_entry(&prefix, &key)
        })
        .collect()
}

/// Stages both entries of a member scored `score`.
pub(super) fn stage_member(batch: &mut WriteBatch, container: &Container, member: &[u8], score: f64) {
    batch.put(
        container.component_key(KeyKind::ZSetValue, member),
        score.to_be_bytes().to_vec(),
    );
    batch.put(
        container.component_key(KeyKind::ZSetScore, &key_codec::score_component(score, member)),
        Vec::new(),
    );
}

impl Keyspace {
    /// Adds or rescores `members`, returning how many were newly added.
    pub fn zadd(&self, key: &[u8], members: &[(f64, Bytes)]) -> StoreResult<i64> {
        if members.iter().any(|(score, _)| score.is_nan()) {
            return Err(StoreError::InvalidFloat);
        }

        let db = self.db_for_write()?;
        let db = &**db;

        let container = match load_container(db, KeyKind::ZSet, key)? {
            Some(container) => container,
            None => Container::new(KeyKind::ZSet, key),
        };

        let mut batch = WriteBatch::new();
        let mut added = 0;
        for (score, member) in members.iter().rev().unique_by(|(_, member)| member.clone()) {
            // -0 and 0 are the same score.
            let score = if *score == 0.0 { 0.0 } else { *score };

            let value_key = container.component_key(KeyKind::ZSetValue, member);
            match db.get(&value_key)? {
                Some(raw) => {
                    let old = decode_score(&raw)?;
                    if old == score {
                        continue;
                    }
                    batch.delete(container.component_key(
                        KeyKind::ZSetScore,
                        &key_codec::score_component(old, member),
                    ));
                }
                None => added += 1,
            }
            stage_member(&mut batch, &container, member, score);
        }

        if batch.is_empty() {
            return Ok(0);
        }

        if added > 0 {
            let count = container.len(db)? + added;
            container.stage_len(&mut batch, count);
        }
        db.write(batch)?;

        Ok(added as i64)
    }

    /// Removes `members`, returning how many existed.
    pub fn zrem(&self, key: &[u8], members: &[Bytes]) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::ZSet, key)? else {
            return Ok(0);
        };

        let mut batch = WriteBatch::new();
        let mut removed = 0;
        for member in members.iter().unique() {
            let value_key = container.component_key(KeyKind::ZSetValue, member);
            if let Some(raw) = db.get(&value_key)? {
                let score = decode_score(&raw)?;
                batch.delete(value_key);
                batch.delete(container.component_key(
                    KeyKind::ZSetScore,
                    &key_codec::score_component(score, member),
                ));
                removed += 1;
            }
        }

        if removed > 0 {
            let count = container.len(db)?.saturating_sub(removed);
            container.stage_len(&mut batch, count);
            db.write(batch)?;
        }

        Ok(removed as i64)
    }

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<f64>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::ZSet, key)? else {
            return Ok(None);
        };

        match db.get(&container.component_key(KeyKind::ZSetValue, member))? {
            Some(raw) => Ok(Some(decode_score(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn zcard(&self, key: &[u8]) -> StoreResult<i64> {
        let db = self.db()?;
        let db = &**db;

        match load_container(db, KeyKind::ZSet, key)? {
            Some(container) => Ok(container.len(db)? as i64),
            None => Ok(0),
        }
    }

    /// Members ranked `start..=stop` by ascending score. Negative indexes count
    /// from the end and out of range indexes are clamped.
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<(Bytes, f64)>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::ZSet, key)? else {
            return Ok(Vec::new());
        };

        let len = container.len(db)? as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        let prefix = container.component_prefix(KeyKind::ZSetScore);
        db.iterate(&prefix, None)
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|entry| -> StoreResult<(Bytes, f64)> {
                let (key, _) = entry?;
                score_entry(&prefix, &key)
            })
            .collect()
    }

    /// Members whose score lies between `min` and `max`, skipping `offset`
    /// matches and returning at most `count` of them. A negative `count` means
    /// no limit.
    pub fn zrange_by_score(
        &self,
        key: &[u8],
        min: ScoreBound,
        max: ScoreBound,
        offset: i64,
        count: i64,
    ) -> StoreResult<Vec<(Bytes, f64)>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::ZSet, key)? else {
            return Ok(Vec::new());
        };
        if offset < 0 || count == 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(count).ok();

        let prefix = container.component_prefix(KeyKind::ZSetScore);
        let start = container.component_key(KeyKind::ZSetScore, &float_codec::encode(min.value));

        let mut skipped = 0;
        let mut range = Vec::new();
        for entry in db.iterate(&prefix, Some(&start)) {
            let (key, _) = entry?;
            let (member, score) = score_entry(&prefix, &key)?;

            if !min.admits_as_min(score) {
                continue;
            }
            if !max.admits_as_max(score) {
                break;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }

            range.push((member, score));
            if limit.is_some_and(|limit| range.len() >= limit) {
                break;
            }
        }

        Ok(range)
    }

    /// Zero-based rank of `member` by ascending score, ties ordered by member.
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<i64>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::ZSet, key)? else {
            return Ok(None);
        };
        let Some(raw) = db.get(&container.component_key(KeyKind::ZSetValue, member))? else {
            return Ok(None);
        };

        let target = container.component_key(
            KeyKind::ZSetScore,
            &key_codec::score_component(decode_score(&raw)?, member),
        );
        let prefix = container.component_prefix(KeyKind::ZSetScore);

        let mut rank = 0;
        for entry in db.iterate(&prefix, None) {
            let (key, _) = entry?;
            if key >= target {
                break;
            }
            rank += 1;
        }

        Ok(Some(rank))
    }

    /// Stores at `destination` the weighted union of the sorted sets (or plain
    /// sets, scored 1) at `keys`, returning its cardinality.
    pub fn zunionstore(&self, destination: &[u8], keys: &[Bytes], weights: &[f64]) -> StoreResult<i64> {
        if weights.len() > keys.len() {
            return Err(StoreError::Syntax);
        }

        let db = self.db_for_write()?;
        let db = &**db;

        let mut union: BTreeMap<Bytes, f64> = BTreeMap::new();
        for (index, key) in keys.iter().enumerate() {
            let weight = weights.get(index).copied().unwrap_or(1.0);

            let entries = match find_object(db, key)? {
                None => continue,
                Some((KeyKind::ZSet, stored)) => {
                    zset_entries(db, &Container::from_stored(KeyKind::ZSet, key, &stored))?
                }
                Some((KeyKind::Set, stored)) => {
                    let container = Container::from_stored(KeyKind::Set, key, &stored);
                    let prefix = container.component_prefix(KeyKind::SetMember);
                    db.iterate(&prefix, None)
                        .map(|entry| -> StoreResult<(Bytes, f64)> {
                            let (key, _) = entry?;
                            Ok((Bytes::copy_from_slice(&key[prefix.len()..]), 1.0))
                        })
                        .collect::<StoreResult<Vec<_>>>()?
                }
                Some(_) => return Err(StoreError::WrongType),
            };

            for (member, score) in entries {
                let total = union.entry(member).or_insert(0.0);
                // inf * 0 and inf - inf count as zero.
                let weighted = weight * score;
                let weighted = if weighted.is_nan() { 0.0 } else { weighted };
                let sum = *total + weighted;
                *total = if sum.is_nan() { 0.0 } else { sum };
            }
        }

        let mut batch = WriteBatch::new();
        stage_delete(db, &mut batch, destination)?;
        if !union.is_empty() {
            let container = Container::new(KeyKind::ZSet, destination);
            for (member, score) in &union {
                let score = if *score == 0.0 { 0.0 } else { *score };
                stage_member(&mut batch, &container, member, score);
            }
            container.stage_len(&mut batch, union.len() as u64);
        }
        if !batch.is_empty() {
            db.write(batch)?;
        }

        Ok(union.len() as i64)
    }

    pub(super) fn zset_value(
        &self,
        db: &dyn StorageBackend,
        key: &[u8],
        stored: &[u8],
    ) -> StoreResult<Vec<(Bytes, f64)>> {
        zset_entries(db, &Container::from_stored(KeyKind::ZSet, key, stored))
    }
}
