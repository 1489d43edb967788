use std::convert::TryFrom;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{DartsError, DartsResult};
use crate::trie::builder;
use crate::trie::{PrefixMatch, Searcher, Traverse, Unit};
use crate::util::{self, InputUtil, OutputUtil, UNIT_SIZE};

/// バイト列のキーを整数値に対応付ける、構築後は不変のDoubleArray
///
/// 構築または読み込みが終わった後は読み込み専用なので、ロックせずに複数スレッドから検索できる。
/// 構築前や`clear()`後の空の状態では、全ての検索が「見つからない」になる。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoubleArray {
    units: Box<[Unit]>,
}

impl DoubleArray {
    pub fn new() -> DoubleArray {
        DoubleArray::default()
    }

    pub(crate) fn from_units(units: Box<[Unit]>) -> DoubleArray {
        DoubleArray { units }
    }

    /// キーの集合からDoubleArrayを構築する。値はソート済みキー列での添字になる
    ///
    /// 失敗した場合、現在の内容は変更されない
    /// # Arguments
    /// * `keys` - バイト列として昇順にソートされ、重複のないキーのリスト
    pub fn build<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> DartsResult<()> {
        *self = builder::build(keys, None)?;
        Ok(())
    }

    /// キーと値の集合からDoubleArrayを構築する
    /// # Arguments
    /// * `keys`   - バイト列として昇順にソートされ、重複のないキーのリスト
    /// * `values` - `keys`と同じ長さの値のリスト。各値は`VALUE_LIMIT`以下
    pub fn build_with_values<K: AsRef<[u8]>>(&mut self, keys: &[K], values: &[u32]) -> DartsResult<()> {
        *self = builder::build(keys, Some(values))?;
        Ok(())
    }

    /// 内容を破棄して空の状態に戻す
    pub fn clear(&mut self) {
        self.units = Box::default();
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// ユニット数
    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// 1ユニットのバイト数
    pub fn unit_size(&self) -> usize {
        UNIT_SIZE
    }

    /// 配列全体のバイト数
    pub fn total_size(&self) -> usize {
        self.size() * self.unit_size()
    }

    pub fn searcher(&self) -> Searcher<'_> {
        Searcher::new(&self.units)
    }

    pub fn exact_match_search(&self, key: &[u8]) -> Option<u32> {
        self.searcher().exact_match_search(key)
    }

    pub fn common_prefix_search(&self, key: &[u8]) -> Vec<PrefixMatch> {
        self.searcher().common_prefix_search(key)
    }

    pub fn each_common_prefix<F>(&self, key: &[u8], callback: F)
    where
        F: FnMut(usize, u32),
    {
        self.searcher().each_common_prefix(key, callback)
    }

    pub fn traverse(&self, key: &[u8], node_pos: &mut usize, key_pos: &mut usize) -> Traverse {
        self.searcher().traverse(key, node_pos, key_pos)
    }

    /// 複数のキーに対してexact-match検索を行い、入力と同じ順序で結果を返す
    pub fn exact_match_search_batch<K>(&self, keys: &[K]) -> Vec<Option<u32>>
    where
        K: AsRef<[u8]> + Sync,
    {
        let searcher = self.searcher();
        #[cfg(feature = "parallel")]
        let iter = keys.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = keys.iter();
        iter.map(|k| searcher.exact_match_search(k.as_ref())).collect()
    }

    /// 複数のキーに対してcommon-prefix検索を行い、入力と同じ順序で結果を返す
    pub fn common_prefix_search_batch<K>(&self, keys: &[K]) -> Vec<Vec<PrefixMatch>>
    where
        K: AsRef<[u8]> + Sync,
    {
        let searcher = self.searcher();
        #[cfg(feature = "parallel")]
        let iter = keys.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = keys.iter();
        iter.map(|k| searcher.common_prefix_search(k.as_ref())).collect()
    }

    /// 他の形式に埋め込むためのユニット列
    pub fn array(&self) -> &[Unit] {
        &self.units
    }

    /// ユニット列をそのまま内容として採用する。構造の正しさは検証しない
    pub fn set_array<U: Into<Box<[Unit]>>>(&mut self, units: U) -> DartsResult<()> {
        let units = units.into();
        util::check_unit_count(units.len())?;
        self.units = units;
        Ok(())
    }

    /// リトルエンディアンのバイト列に変換する。ヘッダなどは含まない
    pub fn to_bytes(&self) -> Vec<u8> {
        util::units_to_bytes(&self.units)
    }

    /// `to_bytes()`で作成したバイト列から内容を置き換える
    ///
    /// 長さがユニットサイズの倍数でない場合はエラーになり、現在の内容は変更されない
    pub fn from_bytes(&mut self, bytes: &[u8]) -> DartsResult<()> {
        self.units = util::units_from_bytes(bytes)?;
        Ok(())
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> DartsResult<()> {
        let mut writer = BufWriter::new(writer);
        writer.put_units(&self.units)?;
        Ok(writer.flush()?)
    }

    /// `byte_len`バイト分のユニット列を読み込んで内容を置き換える
    pub fn read_from<R: io::Read>(&mut self, reader: R, byte_len: usize) -> DartsResult<()> {
        let count = util::check_shape(byte_len)?;
        let mut reader = BufReader::new(reader);
        self.units = reader.get_unit_array(count)?;
        Ok(())
    }

    /// DoubleArrayをファイルに保存する
    /// # Arguments
    /// * `filepath` - 保存先ファイルのパス
    pub fn save<P: AsRef<Path>>(&self, filepath: P) -> DartsResult<()> {
        let filepath = filepath.as_ref();
        info!("save: {}, units: {}", filepath.display(), self.size());
        self.write_to(File::create(filepath)?)
    }

    /// 保存されているDoubleArrayを読み込んで、内容を置き換える
    ///
    /// 失敗した場合、現在の内容は変更されない
    /// # Arguments
    /// * `filepath` - 読み込むファイルのパス
    pub fn open<P: AsRef<Path>>(&mut self, filepath: P) -> DartsResult<()> {
        let filepath = filepath.as_ref();
        let bytes = fs::read(filepath)?;
        self.from_bytes(&bytes)?;
        info!("open: {}, units: {}", filepath.display(), self.size());
        Ok(())
    }

    /// ファイルからDoubleArrayを読み込む
    pub fn from_path<P: AsRef<Path>>(filepath: P) -> DartsResult<DoubleArray> {
        let mut da = DoubleArray::new();
        da.open(filepath)?;
        Ok(da)
    }
}

impl<'a> From<&'a DoubleArray> for Searcher<'a> {
    fn from(da: &'a DoubleArray) -> Searcher<'a> {
        da.searcher()
    }
}

impl TryFrom<File> for DoubleArray {
    type Error = DartsError;

    /// ファイルサイズを元にユニット数を決めて読み込む
    fn try_from(file: File) -> DartsResult<DoubleArray> {
        let len = file.metadata()?.len() as usize;
        debug!("file size: {}", len);
        let mut da = DoubleArray::new();
        da.read_from(file, len)?;
        Ok(da)
    }
}

#[cfg(test)]
mod tests {
    use super::DoubleArray;
    use crate::error::DartsError;
    use crate::trie::{PrefixMatch, Unit};
    use std::convert::TryFrom;
    use std::fs::File;
    use std::io::Cursor;

    fn sample() -> DoubleArray {
        let mut da = DoubleArray::new();
        da.build_with_values(&["apple", "apply", "banana", "band"], &[10, 20, 30, 40])
            .unwrap();
        da
    }

    #[test]
    fn test_new_is_empty() {
        let da = DoubleArray::new();
        assert!(da.is_empty());
        assert_eq!(da.size(), 0);
        assert_eq!(da.total_size(), 0);
        assert_eq!(da.exact_match_search(b"apple"), None);
        assert!(da.common_prefix_search(b"apple").is_empty());
        assert_eq!(da.exact_match_search_batch(&["a", "b"]), vec![None, None]);
    }

    #[test]
    fn test_sizes() {
        let da = sample();
        assert!(!da.is_empty());
        assert_eq!(da.unit_size(), 4);
        assert_eq!(da.total_size(), da.size() * 4);
        assert_eq!(da.to_bytes().len(), da.total_size());
    }

    #[test]
    fn test_clear() {
        let mut da = sample();
        da.clear();
        assert!(da.is_empty());
        assert_eq!(da.exact_match_search(b"apple"), None);
        da.clear();
        assert!(da.is_empty());
    }

    #[test]
    fn test_failed_build_keeps_contents() {
        let mut da = sample();
        assert!(da.build(&["b", "a"]).is_err());
        assert_eq!(da.exact_match_search(b"band"), Some(40));
    }

    #[test]
    fn test_batch_matches_single() {
        let da = sample();
        let queries = ["apple", "app", "band", "bandana", "zzz"];
        let batch = da.exact_match_search_batch(&queries);
        let single: Vec<_> = queries.iter().map(|q| da.exact_match_search(q.as_bytes())).collect();
        assert_eq!(batch, single);
        assert_eq!(batch, vec![Some(10), None, Some(40), None, None]);

        let batch = da.common_prefix_search_batch(&queries);
        for (q, r) in queries.iter().zip(&batch) {
            assert_eq!(r, &da.common_prefix_search(q.as_bytes()));
        }
        assert_eq!(batch[3], vec![PrefixMatch { length: 4, value: 40 }]);
    }

    #[test]
    fn test_bytes_round_trip() {
        let da = sample();
        let mut loaded = DoubleArray::new();
        loaded.from_bytes(&da.to_bytes()).unwrap();
        assert_eq!(loaded, da);
        assert_eq!(loaded.exact_match_search(b"apply"), Some(20));
    }

    #[test]
    fn test_from_bytes_rejects_ragged_length() {
        let mut da = sample();
        let mut bytes = da.to_bytes();
        bytes.pop();
        match da.from_bytes(&bytes) {
            Err(DartsError::CorruptData(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        // 読み込みに失敗しても内容は変わらない
        assert_eq!(da.exact_match_search(b"apple"), Some(10));
    }

    #[test]
    fn test_array_round_trip() {
        let da = sample();
        let mut copy = DoubleArray::new();
        copy.set_array(da.array().to_vec()).unwrap();
        assert_eq!(copy.exact_match_search(b"banana"), Some(30));
        assert_eq!(copy.common_prefix_search(b"applesauce"), da.common_prefix_search(b"applesauce"));

        let raw: Vec<u32> = da.array().iter().map(|&u| u.into()).collect();
        let units: Vec<Unit> = raw.into_iter().map(Unit::from).collect();
        copy.set_array(units).unwrap();
        assert_eq!(copy, da);
    }

    #[test]
    fn test_write_and_read_stream() {
        let da = sample();
        let mut buf = Vec::new();
        da.write_to(&mut buf).unwrap();
        assert_eq!(buf, da.to_bytes());

        let mut loaded = DoubleArray::new();
        loaded.read_from(Cursor::new(&buf), buf.len()).unwrap();
        assert_eq!(loaded, da);

        let mut truncated = DoubleArray::new();
        assert!(matches!(
            truncated.read_from(Cursor::new(&buf[..4]), buf.len()),
            Err(DartsError::Io(_))
        ));
        assert!(truncated.is_empty());
    }

    #[test]
    fn test_read_from_overstated_length() {
        let mut da = sample();
        let buf = da.to_bytes();
        // 実際よりはるかに長いバイト数を指定しても、途中で読み込みエラーになるだけ
        assert!(matches!(
            da.read_from(Cursor::new(&buf), 1 << 30),
            Err(DartsError::Io(_))
        ));
        assert_eq!(da.exact_match_search(b"apply"), Some(20));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.darts");
        let da = sample();
        da.save(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, da.total_size());

        let loaded = DoubleArray::from_path(&path).unwrap();
        assert_eq!(loaded, da);

        let loaded = DoubleArray::try_from(File::open(&path).unwrap()).unwrap();
        assert_eq!(loaded.exact_match_search(b"banana"), Some(30));
    }

    #[test]
    fn test_open_missing_file_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut da = sample();
        match da.open(dir.path().join("missing.darts")) {
            Err(DartsError::Io(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(da.exact_match_search(b"band"), Some(40));
    }
}
