use super::unit;

/// バイト列をラベルのストリームとして扱うためのstruct。
/// readメソッドで個々のバイトを順に読み込み、キーの終端に達した場合には
/// `unit::TERMINATE_LABEL` が返される。
pub struct KeyStream<'a> {
    s: &'a [u8],
    cur: usize,
}

impl<'a> KeyStream<'a> {
    pub fn new(key: &'a [u8], start: usize) -> KeyStream<'a> {
        KeyStream { s: key, cur: start }
    }

    pub fn read(&mut self) -> u8 {
        if self.eos() {
            unit::TERMINATE_LABEL
        } else {
            let c = self.s[self.cur];
            self.cur += 1;
            c
        }
    }

    pub fn eos(&self) -> bool {
        self.cur == self.s.len()
    }

    /// 読み込み済みのバイト数
    pub fn position(&self) -> usize {
        self.cur
    }
}
