use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ja,
    Zh,
    Ko,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::Ja, Language::Zh, Language::Ko];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
            Language::Ko => "ko",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

impl FromStr for Language {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        // accept region-tagged codes such as "ja-JP" or "zh_TW"
        let primary = code.split(['-', '_']).next().unwrap_or("");
        Language::ALL
            .into_iter()
            .find(|l| l.code() == primary)
            .ok_or_else(|| QueryError::UnknownLanguage(s.to_string()))
    }
}

// key, en, ja, zh, ko ("" = not translated yet)
const BUILTIN: &[(&str, &str, &str, &str, &str)] = &[
    ("heading.properties", "Kyoto Real Estate", "京都の不動産", "京都房地产", "교토 부동산"),
    ("heading.activities", "Things to Do in Kyoto", "京都のアクティビティ", "京都活动", "교토 액티비티"),
    ("heading.experiences", "Cultural Experiences", "文化体験", "文化体验", "문화 체험"),
    ("sort.newest", "Newest", "新着順", "最新", "최신순"),
    ("sort.price-low", "Price: Low to High", "価格の安い順", "价格从低到高", "낮은 가격순"),
    ("sort.price-high", "Price: High to Low", "価格の高い順", "价格从高到低", "높은 가격순"),
    ("sort.rating", "Top Rated", "評価の高い順", "评分最高", "평점순"),
    ("sort.featured", "Featured", "おすすめ", "精选", "추천"),
    ("sort.size", "Largest", "広さ順", "面积最大", "넓은 순"),
    ("sort.walk-score", "Walk Score", "ウォークスコア順", "步行指数", "도보 점수순"),
    ("sort.year-built", "Newest Build", "築年数の新しい順", "最新建成", "신축순"),
    ("duration.short", "Up to 2 hours", "2時間以内", "2小时以内", "2시간 이내"),
    ("duration.medium", "2 to 4 hours", "2〜4時間", "2至4小时", "2~4시간"),
    ("duration.long", "Over 4 hours", "4時間以上", "4小时以上", "4시간 이상"),
    ("label.price", "Price", "価格", "价格", "가격"),
    ("label.rating", "Rating", "評価", "评分", "평점"),
    ("label.unrated", "New", "新規", "新上线", "신규"),
    ("label.featured", "Featured", "おすすめ", "精选", "추천"),
    ("label.favorite", "Saved", "保存済み", "已收藏", "저장됨"),
    ("results.count", "{count} results", "{count}件", "{count}个结果", "{count}개 결과"),
    ("results.page", "Page {page} of {pages}", "{pages}ページ中{page}ページ目", "第{page}页，共{pages}页", "{pages}페이지 중 {page}페이지"),
    ("results.none", "No listings match your search. Try removing a filter.", "条件に一致する結果が見つかりません。フィルターを減らしてみてください。", "没有符合条件的结果。请尝试减少筛选条件。", "조건에 맞는 결과가 없습니다. 필터를 줄여 보세요."),
    ("favorite.added", "Added {id} to favorites", "{id}をお気に入りに追加しました", "已将{id}加入收藏", "{id}을(를) 즐겨찾기에 추가했습니다"),
    ("favorite.removed", "Removed {id} from favorites", "{id}をお気に入りから削除しました", "已将{id}移出收藏", "{id}을(를) 즐겨찾기에서 삭제했습니다"),
    ("live.update", "Live update", "リアルタイム更新", "", ""),
    ("facets.heading", "Categories", "カテゴリー", "类别", ""),
];

/// Flat per-language string tables with English fallback.
#[derive(Debug, Clone, Default)]
pub struct Translations {
    tables: HashMap<Language, HashMap<String, String>>,
}

impl Translations {
    pub fn new() -> Self { Self::default() }

    pub fn builtin() -> Self {
        let mut t = Self::new();
        for (key, en, ja, zh, ko) in BUILTIN {
            for (lang, text) in [(Language::En, en), (Language::Ja, ja), (Language::Zh, zh), (Language::Ko, ko)] {
                if !text.is_empty() {
                    t.insert(lang, key, text);
                }
            }
        }
        t
    }

    pub fn insert(&mut self, lang: Language, key: &str, text: &str) {
        self.tables.entry(lang).or_default().insert(key.to_string(), text.to_string());
    }

    /// The entry for `lang`, else the English entry, else the key itself.
    pub fn get<'a>(&'a self, lang: Language, key: &'a str) -> &'a str {
        self.lookup(lang, key)
            .or_else(|| self.lookup(Language::En, key))
            .unwrap_or(key)
    }

    fn lookup(&self, lang: Language, key: &str) -> Option<&str> {
        self.tables.get(&lang)?.get(key).map(String::as_str)
    }

    /// [`Translations::get`] with `{name}` placeholders substituted.
    pub fn format(&self, lang: Language, key: &str, args: &[(&str, String)]) -> String {
        let mut text = self.get(lang, key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    /// Overlay tables from `{"ja": {"key": "text"}, ...}`.
    pub fn merge_json(&mut self, json: &str) -> Result<()> {
        let raw: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)?;
        for (code, entries) in raw {
            let lang: Language = code.parse()?;
            for (key, text) in entries {
                self.insert(lang, &key, &text);
            }
        }
        Ok(())
    }
}
