use std::cmp;
use std::io;
use std::mem;

use byteorder::{ByteOrder, LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::error::{DartsError, DartsResult};
use crate::trie::unit::{self, Unit};

/// 1ユニットのバイト数
pub const UNIT_SIZE: usize = mem::size_of::<u32>();

/// 読み込み可能なユニット数の上限
///
/// 構築される配列は`BASE_LIMIT`を超えないので、これより長い配列は壊れている
pub const MAX_UNITS: usize = unit::BASE_LIMIT;

/// 読み込み前に確保しておくユニット数の上限。これを超える分は読み込みながら確保する
const READ_RESERVE_LIMIT: usize = 1 << 16;

pub trait InputUtil: io::Read {
    fn get_unit(&mut self) -> io::Result<Unit> {
        self.read_u32::<LE>().map(Unit::from)
    }

    fn get_unit_array(&mut self, count: usize) -> io::Result<Box<[Unit]>> {
        let mut v = Vec::with_capacity(cmp::min(count, READ_RESERVE_LIMIT));
        for _ in 0..count {
            v.push(self.get_unit()?);
        }
        Ok(v.into_boxed_slice())
    }
}

impl<R: io::Read + ?Sized> InputUtil for R {}

pub trait OutputUtil: io::Write {
    fn put_units(&mut self, units: &[Unit]) -> io::Result<()> {
        for u in units {
            self.write_u32::<LE>(u32::from(*u))?;
        }
        Ok(())
    }
}

impl<W: io::Write + ?Sized> OutputUtil for W {}

/// ユニット列をバイト列に変換する
pub fn units_to_bytes(units: &[Unit]) -> Vec<u8> {
    let mut buf = vec![0u8; units.len() * UNIT_SIZE];
    for (chunk, u) in buf.chunks_exact_mut(UNIT_SIZE).zip(units) {
        LE::write_u32(chunk, u32::from(*u));
    }
    buf
}

/// バイト列をユニット列に変換する。長さがユニットサイズの倍数でない場合はエラー
pub fn units_from_bytes(bytes: &[u8]) -> DartsResult<Box<[Unit]>> {
    check_shape(bytes.len())?;
    Ok(bytes
        .chunks_exact(UNIT_SIZE)
        .map(|chunk| Unit::from(LE::read_u32(chunk)))
        .collect())
}

/// バイト数が配列として妥当か確認し、ユニット数を返す
pub fn check_shape(byte_len: usize) -> DartsResult<usize> {
    if byte_len % UNIT_SIZE != 0 {
        return Err(DartsError::CorruptData(format!(
            "length {} is not a multiple of the unit size {}",
            byte_len, UNIT_SIZE
        )));
    }
    check_unit_count(byte_len / UNIT_SIZE)
}

pub fn check_unit_count(count: usize) -> DartsResult<usize> {
    if count > MAX_UNITS {
        return Err(DartsError::CorruptData(format!(
            "{} units exceed the addressable range",
            count
        )));
    }
    Ok(count)
}
