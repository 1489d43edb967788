use std::mem;

use crate::error::{DartsError, DartsResult};
use crate::trie::keystream::KeyStream;
use crate::trie::unit::{self, Unit};

/// common-prefix検索で見つかったキー
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixMatch {
    /// 一致したキーの長さ(バイト数)
    pub length: usize,
    /// キーに対応する値
    pub value: u32,
}

/// `Searcher::traverse()`の結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traverse {
    /// 辿り着いたノードがキーの終端で、その値
    Value(u32),
    /// 遷移は成功したが、辿り着いたノードはキーの終端ではない
    NoValue,
    /// 途中で遷移に失敗した
    Missing,
}

/// DoubleArray検索用のstruct
///
/// ユニット列を借用するだけなので、コピーして複数スレッドから同時に使える
#[derive(Clone, Copy, Debug)]
pub struct Searcher<'a> {
    units: &'a [Unit],
}

impl<'a> Searcher<'a> {
    pub fn new(units: &'a [Unit]) -> Searcher<'a> {
        Searcher { units }
    }

    /// リトルエンディアンのバイト列を、コピーせずにユニット列として扱う
    ///
    /// mmapしたファイルなどをそのまま検索するためのもので、リトルエンディアン環境かつ
    /// バッファが4byte境界に揃っている場合にのみ使える
    pub fn from_bytes(bytes: &'a [u8]) -> DartsResult<Searcher<'a>> {
        if bytes.len() % mem::size_of::<Unit>() != 0 {
            return Err(DartsError::CorruptData(format!(
                "length {} is not a multiple of the unit size",
                bytes.len()
            )));
        }
        if cfg!(target_endian = "big") {
            return Err(DartsError::CorruptData(
                "zero-copy view requires a little-endian host".to_string(),
            ));
        }
        let units = bytemuck::try_cast_slice(bytes)
            .map_err(|e| DartsError::CorruptData(format!("cannot view buffer as units: {:?}", e)))?;
        Ok(Searcher { units })
    }

    pub fn units(&self) -> &'a [Unit] {
        self.units
    }

    /// キーを検索する
    /// キーが見つかった場合はその値を、見つからなかった場合は`None`を返す
    /// # Arguments
    /// * `key` - 検索対象のキー
    pub fn exact_match_search(&self, key: &[u8]) -> Option<u32> {
        let mut node = 0;
        let mut key_pos = 0;
        match self.traverse(key, &mut node, &mut key_pos) {
            Traverse::Value(v) => Some(v),
            _ => None,
        }
    }

    /// common-prefix検索を行う
    ///
    /// `key`の接頭辞になっているキーを、短いものから順に返す
    pub fn common_prefix_search(&self, key: &[u8]) -> Vec<PrefixMatch> {
        let mut result = Vec::new();
        self.each_common_prefix(key, |length, value| {
            result.push(PrefixMatch { length, value })
        });
        result
    }

    /// common-prefix検索を行う
    ///
    /// 条件に一致するキーが見つかる度に、callbackが呼び出される
    /// # Arguments
    /// * `key` - 検索対象のキー
    /// * `callback` - 一致を検出した場合に`(キーの長さ, 値)`で呼び出されるクロージャー
    pub fn each_common_prefix<F>(&self, key: &[u8], mut callback: F)
    where
        F: FnMut(usize, u32),
    {
        let mut id = 0;
        let mut node = match self.units.first() {
            Some(&root) => root,
            None => return,
        };
        let mut input = KeyStream::new(key, 0);

        loop {
            if let Some(value) = self.terminal_value(id, node) {
                callback(input.position(), value);
            }
            if input.eos() {
                return;
            }

            match self.child(id, node, input.read()) {
                Some((idx, child)) => {
                    id = idx;
                    node = child;
                }
                None => return,
            }
        }
    }

    /// `node_pos`のノードから`key[key_pos..]`を辿る
    ///
    /// 遷移に成功した分だけ`node_pos`と`key_pos`が進むので、
    /// キーを少しずつ与えながら検索を続けることができる
    pub fn traverse(&self, key: &[u8], node_pos: &mut usize, key_pos: &mut usize) -> Traverse {
        let mut node = match self.units.get(*node_pos) {
            Some(&unit) if !unit.is_leaf() => unit,
            _ => return Traverse::Missing,
        };

        while *key_pos < key.len() {
            match self.child(*node_pos, node, key[*key_pos]) {
                Some((idx, child)) => {
                    *node_pos = idx;
                    node = child;
                    *key_pos += 1;
                }
                None => return Traverse::Missing,
            }
        }

        match self.terminal_value(*node_pos, node) {
            Some(value) => Traverse::Value(value),
            None => Traverse::NoValue,
        }
    }

    /// 位置`id`のノード`node`からラベル`label`で遷移した先のユニットとその添字
    #[inline]
    fn child(&self, id: usize, node: Unit, label: u8) -> Option<(usize, Unit)> {
        if label == unit::TERMINATE_LABEL {
            return None;
        }
        let idx = node.base_at(id) ^ label as usize;
        match self.units.get(idx) {
            Some(&unit) if unit.is_child_by(label) => Some((idx, unit)),
            _ => None,
        }
    }

    #[inline]
    fn terminal_value(&self, id: usize, node: Unit) -> Option<u32> {
        if !node.has_leaf() {
            return None;
        }
        let idx = node.base_at(id) ^ unit::TERMINATE_LABEL as usize;
        match self.units.get(idx) {
            Some(&unit) if unit.is_leaf() => Some(unit.value()),
            _ => None,
        }
    }
}
