use crate::error::DartsResult;
use crate::trie::allocator::Allocator;
use crate::trie::unit::Unit;

/// 構築中のDoubleArray
///
/// ユニット列と、空きセルを管理する`Allocator`を保持する。
/// `Allocator`は構築時のみ必要なので、`finish()`で破棄してユニット列だけを返す。
pub struct DoubleArrayStore {
    units: Vec<Unit>,
    alloca: Allocator,
}

impl DoubleArrayStore {
    /// 空のストアを作成する。ルートの位置(0)は最初から使用中として扱われる
    pub fn new() -> DoubleArrayStore {
        DoubleArrayStore {
            units: Vec::new(),
            alloca: Allocator::new(),
        }
    }

    /// 位置`id`のノードの遷移ラベル群を受け取り、それらの遷移先が全て空いているbaseを割り当てる。
    /// 遷移先セルは使用中になり、ユニット列はそれらを含む長さまで拡張される
    pub fn allocate_node(&mut self, id: usize, labels: &[u8]) -> DartsResult<usize> {
        let base = self.alloca.x_check(id, labels)?;
        if let Some(last) = labels.iter().map(|&l| base ^ l as usize).max() {
            self.extend_to(last + 1);
        }
        Ok(base)
    }

    pub fn set_unit(&mut self, index: usize, unit: Unit) {
        self.extend_to(index + 1);
        self.units[index] = unit;
    }

    pub fn mark_used(&mut self, index: usize) -> DartsResult<()> {
        self.alloca.alloc(index)?;
        self.extend_to(index + 1);
        Ok(())
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.alloca.is_used(index)
    }

    /// ユニット列を少なくとも`min_size`まで拡張する。拡張された領域は空きユニットで埋められる
    pub fn extend_to(&mut self, min_size: usize) {
        if self.units.len() < min_size {
            self.units.resize(min_size, Unit::default());
        }
    }

    pub fn get(&self, index: usize) -> Unit {
        self.units.get(index).copied().unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// 構築を終え、末尾の未使用部分を取り除いたユニット列を返す
    pub fn finish(self) -> Vec<Unit> {
        let DoubleArrayStore { mut units, alloca } = self;
        let mut node_size = units.len();
        while node_size > 1 && !alloca.is_used(node_size - 1) {
            node_size -= 1;
        }
        units.truncate(node_size);
        units.shrink_to_fit();
        units
    }
}
