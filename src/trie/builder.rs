use log::debug;

use crate::double_array::DoubleArray;
use crate::error::{DartsError, DartsResult};
use crate::trie::keystream::KeyStream;
use crate::trie::store::DoubleArrayStore;
use crate::trie::unit::{self, Unit};

/// キーの集合からDoubleArrayの構築を行う
///
/// キーはバイト列として辞書順に昇順ソートされ、重複がなく、0バイトを含まない必要がある。
/// 値を指定しなかった場合は、ソート済みキー列での添字が値になる。
///
/// ```
/// use darts::Builder;
///
/// let keys: Vec<&[u8]> = vec![b"a", b"ab", b"b"];
/// let da = Builder::new(&keys).values(&[10, 20, 30]).build().unwrap();
/// assert_eq!(da.exact_match_search(b"ab"), Some(20));
/// ```
pub struct Builder<'a, K: AsRef<[u8]>> {
    keys: &'a [K],
    values: Option<&'a [u32]>,
    progress: Option<Box<dyn FnMut(usize, usize) + 'a>>,
}

impl<'a, K: AsRef<[u8]>> Builder<'a, K> {
    pub fn new(keys: &'a [K]) -> Builder<'a, K> {
        Builder {
            keys,
            values: None,
            progress: None,
        }
    }

    /// キーと同じ長さの値のリストを指定する
    pub fn values(mut self, values: &'a [u32]) -> Builder<'a, K> {
        self.values = Some(values);
        self
    }

    /// 構築の進捗を受け取るクロージャーを指定する
    ///
    /// キーの終端ユニットを書き込む度に`(書き込み済みキー数, 全キー数)`で呼び出される
    pub fn progress<F>(mut self, callback: F) -> Builder<'a, K>
    where
        F: FnMut(usize, usize) + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn build(mut self) -> DartsResult<DoubleArray> {
        self.check_input()?;

        let mut store = DoubleArrayStore::new();
        store.mark_used(0)?;
        if !self.keys.is_empty() {
            self.build_impl(&mut store)?;
        }
        let reserved = store.size();
        let units = store.finish();
        debug!("keys: {}, units: {} (reserved: {})", self.keys.len(), units.len(), reserved);

        Ok(DoubleArray::from_units(units.into_boxed_slice()))
    }

    fn check_input(&self) -> DartsResult<()> {
        if let Some(values) = self.values {
            if values.len() != self.keys.len() {
                return Err(DartsError::InvalidInput(format!(
                    "{} keys but {} values",
                    self.keys.len(),
                    values.len()
                )));
            }
            if let Some(index) = values.iter().position(|&v| v > unit::VALUE_LIMIT) {
                return Err(DartsError::ValueOutOfRange {
                    index,
                    value: values[index],
                });
            }
        } else if self.keys.len() > unit::VALUE_LIMIT as usize + 1 {
            let index = unit::VALUE_LIMIT as usize + 1;
            return Err(DartsError::ValueOutOfRange {
                index,
                value: index as u32,
            });
        }

        for (i, key) in self.keys.iter().enumerate() {
            let key = key.as_ref();
            if key.contains(&unit::TERMINATE_LABEL) {
                return Err(DartsError::InvalidInput(format!(
                    "key #{} contains a NUL byte",
                    i
                )));
            }
            if i > 0 && self.keys[i - 1].as_ref() >= key {
                return Err(DartsError::InvalidInput(format!(
                    "key #{} is not greater than its predecessor; keys must be sorted and unique",
                    i
                )));
            }
        }
        Ok(())
    }

    fn value_of(&self, index: usize) -> u32 {
        match self.values {
            Some(values) => values[index],
            None => index as u32,
        }
    }

    /// 暗黙のtrieを深さ優先で辿りながら、各ノードの子をまとめて配置する
    fn build_impl(&mut self, store: &mut DoubleArrayStore) -> DartsResult<()> {
        let keys = self.keys;
        let total = keys.len();
        let mut ks_list: Vec<KeyStream> = keys
            .iter()
            .map(|k| KeyStream::new(k.as_ref(), 0))
            .collect();
        let mut done = 0;

        // (beg, end, node): ks_list[beg..end]は全てnodeまでの接頭辞を共有している
        let mut stack = vec![(0usize, total, 0usize)];
        let mut label_list: Vec<u8> = Vec::new();
        let mut end_list: Vec<usize> = Vec::new();

        while let Some((beg, end, node)) = stack.pop() {
            label_list.clear();
            end_list.clear();

            // nodeから遷移するラベルを集める。キーはソート済みなので、ラベルも昇順に並ぶ
            for i in beg..end {
                let cur = ks_list[i].read();
                if label_list.last() != Some(&cur) {
                    label_list.push(cur);
                    end_list.push(i);
                }
            }
            end_list.push(end);

            let base = store.allocate_node(node, &label_list)?;
            let has_leaf = label_list[0] == unit::TERMINATE_LABEL;
            let mut parent = store.get(node);
            parent.set_offset(node ^ base);
            if has_leaf {
                parent.set_has_leaf();
            }
            store.set_unit(node, parent);

            // 子ノードを作り、ラベルの小さい順に処理されるよう逆順にスタックへ積む
            for i in (0..label_list.len()).rev() {
                let label = label_list[i];
                let child = base ^ label as usize;
                debug_assert!(store.is_used(child));
                if label == unit::TERMINATE_LABEL {
                    store.set_unit(child, Unit::leaf(self.value_of(end_list[i])));
                    done += 1;
                    if let Some(ref mut progress) = self.progress {
                        progress(done, total);
                    }
                } else {
                    store.set_unit(child, Unit::node(0, label, false));
                    stack.push((end_list[i], end_list[i + 1], child));
                }
            }
        }

        Ok(())
    }
}

/// キーの集合からDoubleArrayを構築する
/// # Arguments
/// * `keys`   - ソート済みで重複のないキーのリスト
/// * `values` - キーに対応する値のリスト。`None`の場合はキーの添字が値になる
pub fn build<K: AsRef<[u8]>>(keys: &[K], values: Option<&[u32]>) -> DartsResult<DoubleArray> {
    let builder = Builder::new(keys);
    match values {
        Some(values) => builder.values(values).build(),
        None => builder.build(),
    }
}
