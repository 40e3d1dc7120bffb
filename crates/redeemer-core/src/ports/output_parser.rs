//! OutputParser port - worker 出力からの構造化抽出
//!
//! worker のログは人間向けのテキストで、バージョン管理されたプロトコルではありません。
//! 抽出ルールをこの trait の裏に閉じ込めておけば、worker が構造化出力
//! （例: 1 行 1 JSON）を出すようになっても Scheduler/RunExecutor は変わりません。

use crate::domain::ParsedOutput;

/// OutputParser は失敗しない
///
/// 認識できない行は無視し、何も見つからなければ `ParsedOutput::default()` を返す。
pub trait OutputParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedOutput;
}
