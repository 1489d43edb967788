//! DoubleArrayの1セル(ユニット)のビット配置を定義するモジュール
//!
//! Node unit:  `[31: 0][30..10: offset][9: extension][8: has_leaf][7..0: label]`
//! Value unit: `[31: 1][30..0: value]`
//!
//! ノード`id`の子の位置を求める基準(base)は`id ^ offset`で、ラベル`L`の遷移先は`base ^ L`になる。
//! offsetはノード自身の位置からの相対値なので、配列が大きくなっても小さい値に収まりやすい。

/// 終端ラベル。キーの終わりを表し、キー本体に含めることはできない
pub const TERMINATE_LABEL: u8 = 0;

/// 格納可能な値の最大値
pub const VALUE_LIMIT: u32 = IS_LEAF_BIT - 1;

/// 配列の長さ(およびbase、offset)の上限(この値は含まない)
pub const BASE_LIMIT: usize = OFFSET_FIELD_LIMIT << EXTENSION_SHIFT;

/// 同じbaseを共有するセルのまとまり。baseとその遷移先は必ず同じブロックに入る
pub const BLOCK_SIZE: usize = 1 << 8;

const IS_LEAF_BIT: u32 = 1 << 31;
const HAS_LEAF_BIT: u32 = 1 << 8;
const EXTENSION_BIT: u32 = 1 << 9;
const LABEL_MASK: u32 = 0xFF;
const OFFSET_SHIFT: u32 = 10;
const OFFSET_FIELD_LIMIT: usize = 1 << 21;
const EXTENSION_SHIFT: u32 = 8;

/// 32bitに詰め込まれたDoubleArrayのセル
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unit(u32);

// SAFETY: a transparent wrapper around u32; every bit pattern is a valid Unit.
unsafe impl bytemuck::Zeroable for Unit {}
unsafe impl bytemuck::Pod for Unit {}

impl Unit {
    /// 内部ノード用のユニットを作成する
    /// # Arguments
    /// * `offset`   - 自身の位置とbaseの排他的論理和。`is_encodable_offset()`を満たす必要がある
    /// * `label`    - 親からこのノードへの遷移ラベル
    /// * `has_leaf` - `base ^ TERMINATE_LABEL` に終端ユニットを持つかどうか
    pub fn node(offset: usize, label: u8, has_leaf: bool) -> Unit {
        let mut unit = Unit(u32::from(label));
        unit.set_offset(offset);
        if has_leaf {
            unit.set_has_leaf();
        }
        unit
    }

    /// 終端(値)ユニットを作成する。`value`は`VALUE_LIMIT`以下である必要がある
    pub fn leaf(value: u32) -> Unit {
        debug_assert!(value <= VALUE_LIMIT, "value must fit in 31 bits");
        Unit(IS_LEAF_BIT | value)
    }

    #[inline]
    pub fn is_leaf(self) -> bool {
        self.0 & IS_LEAF_BIT != 0
    }

    #[inline]
    pub fn has_leaf(self) -> bool {
        !self.is_leaf() && self.0 & HAS_LEAF_BIT != 0
    }

    /// 親からの遷移ラベル。値ユニットは常に`TERMINATE_LABEL`
    #[inline]
    pub fn label(self) -> u8 {
        if self.is_leaf() {
            TERMINATE_LABEL
        } else {
            (self.0 & LABEL_MASK) as u8
        }
    }

    #[inline]
    pub fn offset(self) -> usize {
        if self.is_leaf() {
            return 0;
        }
        let field = (self.0 & !IS_LEAF_BIT) >> OFFSET_SHIFT;
        if self.0 & EXTENSION_BIT != 0 {
            (field as usize) << EXTENSION_SHIFT
        } else {
            field as usize
        }
    }

    /// このユニットが位置`id`にある場合の、子の位置の基準
    #[inline]
    pub fn base_at(self, id: usize) -> usize {
        id ^ self.offset()
    }

    /// 終端ユニットに格納されている値。`is_leaf()`が偽の場合は意味を持たない
    #[inline]
    pub fn value(self) -> u32 {
        self.0 & !IS_LEAF_BIT
    }

    /// このユニットが`label`による遷移先(終端ユニット以外)かどうか
    #[inline]
    pub(crate) fn is_child_by(self, label: u8) -> bool {
        self.0 & (IS_LEAF_BIT | LABEL_MASK) == u32::from(label)
    }

    pub fn set_offset(&mut self, offset: usize) {
        debug_assert!(is_encodable_offset(offset), "offset {} is not encodable", offset);
        let field = if offset < OFFSET_FIELD_LIMIT {
            self.0 &= !EXTENSION_BIT;
            offset
        } else {
            self.0 |= EXTENSION_BIT;
            offset >> EXTENSION_SHIFT
        };
        self.0 = (self.0 & (EXTENSION_BIT | HAS_LEAF_BIT | LABEL_MASK)) | ((field as u32) << OFFSET_SHIFT);
    }

    pub fn set_has_leaf(&mut self) {
        self.0 |= HAS_LEAF_BIT;
    }
}

impl From<u32> for Unit {
    fn from(raw: u32) -> Unit {
        Unit(raw)
    }
}

impl From<Unit> for u32 {
    fn from(unit: Unit) -> u32 {
        unit.0
    }
}

/// `offset`をユニットに格納できるかどうか
/// 2^21以上のoffsetは下位8bitが0でなければならない
#[inline]
pub fn is_encodable_offset(offset: usize) -> bool {
    offset < OFFSET_FIELD_LIMIT
        || (offset < BASE_LIMIT && offset & (BLOCK_SIZE - 1) == 0)
}
