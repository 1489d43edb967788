use bit_set::BitSet;

use crate::error::{DartsError, DartsResult};
use crate::trie::unit::{self, BLOCK_SIZE};

/// 空きセルを探索する対象として残しておく、末尾からのブロック数
const NUM_OPEN_BLOCKS: usize = 16;

/// DoubleArray構築時に使用可能なセルを割り当てる
///
/// 配列は`BLOCK_SIZE`個ずつのブロック単位で拡張する。末尾の`NUM_OPEN_BLOCKS`個のブロックにある
/// 未使用セルを双方向リンクリストで繋いでおき、先頭から順に候補となるbaseを探す。
/// それより前のブロックは閉じられ、残った未使用セルは空きのまま二度と割り当てない。
/// リストの先頭(番兵)はルートと同じ添字0を使う。ルートは常に使用中なので衝突しない。
pub struct Allocator {
    lnk: Vec<LinkNode>,
    used_cells: BitSet,
    used_bases: BitSet,
    /// この位置より前のセルは閉じたブロックに属し、リストに含まれない
    closed_end: usize,
}

impl Allocator {
    pub fn new() -> Allocator {
        let mut instance = Allocator {
            lnk: vec![LinkNode::new(0, 0); BLOCK_SIZE],
            used_cells: BitSet::new(),
            used_bases: BitSet::new(),
            closed_end: 0,
        };
        instance.used_cells.insert(0);
        instance.link_cells(1, BLOCK_SIZE);
        instance
    }

    /// 遷移に使用されるラベルのリストを受け取り、それらを割り当て可能なbaseを返す。
    /// 返されたbaseと各ラベルの遷移先セルは使用中になる。
    /// # Arguments
    /// * `id`     - 子を配置するノードの位置。`id ^ base`がエンコード可能なbaseだけを選ぶ
    /// * `labels` - 遷移ラベルのリスト。昇順にソートされ、重複がない必要がある
    /// # Return
    /// 開いているブロックの中で最初に見つかったbase。見つからなければ新しいブロックに置いたbase
    pub fn x_check(&mut self, id: usize, labels: &[u8]) -> DartsResult<usize> {
        debug_assert!(!labels.is_empty());
        let first = labels[0] as usize;

        let mut cur = self.lnk[0].next;
        while cur != 0 {
            let base = cur ^ first;
            if self.can_allocate(id, labels, base) {
                self.take(labels, base);
                return Ok(base);
            }
            cur = self.lnk[cur].next;
        }

        // 開いているブロックに置けないので、新しいブロックにoffsetの下位8bitが0になるよう置く
        let begin = self.lnk.len();
        self.add_block()?;
        let base = begin | (id & (BLOCK_SIZE - 1));
        self.take(labels, base);
        Ok(base)
    }

    /// 指定セルを使用中にする
    pub fn alloc(&mut self, node: usize) -> DartsResult<()> {
        if self.is_used(node) {
            return Ok(());
        }
        while node >= self.lnk.len() {
            self.add_block()?;
        }
        if node >= self.closed_end {
            self.unlink(node);
        }
        self.used_cells.insert(node);
        Ok(())
    }

    pub fn is_used(&self, node: usize) -> bool {
        self.used_cells.contains(node)
    }

    fn can_allocate(&self, id: usize, labels: &[u8], base: usize) -> bool {
        !self.used_bases.contains(base)
            && unit::is_encodable_offset(id ^ base)
            && labels.iter().skip(1).all(|&l| !self.is_used(base ^ l as usize))
    }

    fn take(&mut self, labels: &[u8], base: usize) {
        self.used_bases.insert(base); // このbaseは使用中だというマークをつける
        for &l in labels {
            let node = base ^ l as usize;
            self.unlink(node);
            self.used_cells.insert(node);
        }
    }

    fn unlink(&mut self, node: usize) {
        let p = self.lnk[node].prev;
        let n = self.lnk[node].next;
        self.lnk[p].next = n;
        self.lnk[n].prev = p;
    }

    /// 末尾にブロックを1つ追加し、開いているブロック数を超えた分の古いブロックを閉じる
    fn add_block(&mut self) -> DartsResult<()> {
        let begin = self.lnk.len();
        let end = begin + BLOCK_SIZE;
        if end > unit::BASE_LIMIT {
            return Err(DartsError::CapacityExceeded(unit::BASE_LIMIT));
        }

        self.lnk.resize(end, LinkNode::new(0, 0));
        self.link_cells(begin, end);

        let num_blocks = end / BLOCK_SIZE;
        if num_blocks > NUM_OPEN_BLOCKS {
            self.close_block(num_blocks - NUM_OPEN_BLOCKS - 1);
        }
        Ok(())
    }

    /// `begin..end`のセルを空きリストの末尾に繋ぐ
    fn link_cells(&mut self, begin: usize, end: usize) {
        let mut last = self.lnk[0].prev;
        for i in begin..end {
            self.lnk[i] = LinkNode::new(last, 0);
            self.lnk[last].next = i;
            last = i;
        }
        self.lnk[0].prev = last;
    }

    fn close_block(&mut self, block: usize) {
        let begin = block * BLOCK_SIZE;
        let end = begin + BLOCK_SIZE;
        for i in begin.max(1)..end {
            if !self.is_used(i) {
                self.unlink(i);
            }
        }
        self.closed_end = end;
    }
}

#[derive(Clone)]
struct LinkNode {
    pub prev: usize,
    pub next: usize,
}

impl LinkNode {
    fn new(p: usize, n: usize) -> LinkNode {
        LinkNode { prev: p, next: n }
    }
}

#[cfg(test)]
mod tests {
    use super::{Allocator, NUM_OPEN_BLOCKS};
    use crate::trie::unit::{self, BLOCK_SIZE};

    #[test]
    fn test_first_fit() {
        let mut a = Allocator::new();
        assert_eq!(a.x_check(0, &[1, 2]).unwrap(), 0);
        assert!(a.is_used(1));
        assert!(a.is_used(2));

        // セル1,2は使用済みなので、ラベル1はセル3(base=2)に置かれる
        assert_eq!(a.x_check(1, &[1]).unwrap(), 2);
        assert!(a.is_used(3));
    }

    #[test]
    fn test_bases_are_unique() {
        let mut a = Allocator::new();
        let x = a.x_check(0, &[5]).unwrap();
        assert_eq!(x, 4);
        // セル2は空いているが、そこにラベル6を置くbase=4はすでに使われている
        let y = a.x_check(0, &[6]).unwrap();
        assert_ne!(x, y);
        assert_eq!(y, 5);
        assert!(a.is_used(3));
        assert!(!a.is_used(2));
    }

    #[test]
    fn test_terminate_label_never_hits_root() {
        let mut a = Allocator::new();
        // base=1ではラベル1の遷移先がルート(セル0)になる
        let x = a.x_check(0, &[0, 1]).unwrap();
        assert_eq!(x, 2);
        assert!(a.is_used(2));
        assert!(a.is_used(3));
    }

    #[test]
    fn test_grows_beyond_initial_size() {
        let mut a = Allocator::new();
        let initial = a.lnk.len();
        let mut bases = Vec::new();
        for id in 0..initial {
            bases.push(a.x_check(id, &[0, 255]).unwrap());
        }
        assert!(a.lnk.len() > initial);
        bases.sort();
        bases.dedup();
        assert_eq!(bases.len(), initial);
    }

    #[test]
    fn test_alloc_is_idempotent() {
        let mut a = Allocator::new();
        a.alloc(10).unwrap();
        a.alloc(10).unwrap();
        assert!(a.is_used(10));
        assert_eq!(a.x_check(0, &[10]).unwrap(), 11);
        assert!(a.is_used(1));
    }

    #[test]
    fn test_alloc_extends_blocks() {
        let mut a = Allocator::new();
        a.alloc(BLOCK_SIZE * 3 + 5).unwrap();
        assert!(a.is_used(BLOCK_SIZE * 3 + 5));
        assert_eq!(a.lnk.len(), BLOCK_SIZE * 4);
    }

    #[test]
    fn test_far_parent_gets_aligned_offset() {
        let mut a = Allocator::new();
        let id = 5 << 21 | 3;
        let x = a.x_check(id, &[b'a']).unwrap();
        assert!(unit::is_encodable_offset(id ^ x));
        assert_eq!(x, 3);

        // 最初のブロックには下位8bitが3のbaseが他にないので、新しいブロックを使う
        let y = a.x_check(id + BLOCK_SIZE, &[b'a']).unwrap();
        assert_eq!(y, BLOCK_SIZE | 3);
        assert!(a.is_used(y ^ b'a' as usize));
    }

    #[test]
    fn test_old_blocks_are_closed() {
        let mut a = Allocator::new();
        for _ in 0..NUM_OPEN_BLOCKS {
            a.add_block().unwrap();
        }
        // 最初のブロックは閉じられ、先頭の空きセルは2番目のブロックにある
        assert_eq!(a.lnk[0].next, BLOCK_SIZE);
        assert_eq!(a.x_check(0, &[1]).unwrap(), BLOCK_SIZE ^ 1);

        // 閉じたブロックのセルも使用中にできる
        a.alloc(5).unwrap();
        assert!(a.is_used(5));
        assert_eq!(a.lnk[0].next, BLOCK_SIZE + 1);
    }
}
