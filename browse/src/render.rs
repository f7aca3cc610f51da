use anyhow::Result;
use mrkyoto_core::live::Change;
use mrkyoto_core::{Field, Kind, Language, Listing, Page, Translations};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;

/// Terminal stand-in for the site's result grid: a text table, or JSON when
/// `json` is set.
pub struct Renderer<'a> {
    pub translations: &'a Translations,
    pub lang: Language,
    pub json: bool,
}

impl<'a> Renderer<'a> {
    fn t(&self, key: &'a str) -> &'a str { self.translations.get(self.lang, key) }

    pub fn page<L, W>(&self, out: &mut W, kind: Kind, page: &Page<&L>, favorites: &HashSet<String>) -> Result<()>
    where
        L: Listing + Serialize,
        W: Write,
    {
        if self.json {
            serde_json::to_writer_pretty(&mut *out, page)?;
            writeln!(out)?;
            return Ok(());
        }
        let heading = format!("heading.{kind}");
        let count = self.translations.format(self.lang, "results.count", &[("count", page.total.to_string())]);
        writeln!(out, "{} ({count})", self.translations.get(self.lang, &heading))?;
        if page.items.is_empty() {
            // an empty grid reads as "still loading" on the site; say so explicitly
            writeln!(out, "  {}", self.t("results.none"))?;
            return Ok(());
        }
        for listing in &page.items {
            writeln!(out, "{}", self.row(*listing, favorites.contains(listing.id())))?;
        }
        if page.total_pages > 1 {
            let footer = self.translations.format(
                self.lang,
                "results.page",
                &[("page", page.page.to_string()), ("pages", page.total_pages.to_string())],
            );
            writeln!(out, "  {footer}")?;
        }
        Ok(())
    }

    fn row<L: Listing>(&self, l: &L, favorite: bool) -> String {
        let marker = if l.featured() { '★' } else { ' ' };
        let rating = if l.rating() == 0.0 {
            self.t("label.unrated").to_string()
        } else {
            match l.reviews() {
                Some(n) => format!("{:.1} ({n})", l.rating()),
                None => format!("{:.1}", l.rating()),
            }
        };

        let mut details: Vec<String> = Vec::new();
        if let Some(d) = l.duration().filter(|d| !d.is_empty()) {
            details.push(d.to_string());
        }
        if let Some(n) = l.field(Field::Neighborhood).filter(|n| !n.is_empty()) {
            details.push(n.into_owned());
        } else if let Some(loc) = l.field(Field::Location).filter(|loc| !loc.is_empty()) {
            details.push(loc.into_owned());
        }
        if let Some(beds) = l.field(Field::Bedrooms) {
            details.push(format!("{beds} bd"));
        }
        if let Some(size) = l.size() {
            details.push(size.to_string());
        }
        let fav = if favorite { format!("  ♥ {}", self.t("label.favorite")) } else { String::new() };

        format!(
            "{marker} {:<38} {:>18}  {:<12} {:<16} {}  [{}]{fav}",
            l.title(),
            l.price(),
            rating,
            l.category(),
            details.join(" · "),
            l.id()
        )
    }

    pub fn facets<W: Write>(&self, out: &mut W, counts: &[(String, usize)]) -> Result<()> {
        if self.json {
            serde_json::to_writer_pretty(&mut *out, counts)?;
            writeln!(out)?;
            return Ok(());
        }
        writeln!(out, "{}", self.t("facets.heading"))?;
        for (category, n) in counts {
            writeln!(out, "  {category:<20} {n:>4}")?;
        }
        Ok(())
    }

    pub fn change<W: Write>(&self, out: &mut W, change: &Change) -> Result<()> {
        let label = self.t("live.update");
        match change {
            Change::Rating { id, from, to } => writeln!(out, "~ {label}: {id} {:.1} -> {:.1}", from, to)?,
            Change::Price { id, from, to } => writeln!(out, "~ {label}: {id} {from} -> {to}")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrkyoto_core::engine::execute;
    use mrkyoto_core::{Activity, Catalog, Query};

    fn render(lang: Language, query: &Query) -> String {
        let translations = Translations::builtin();
        let catalog = Catalog::<Activity>::bundled().unwrap();
        let renderer = Renderer { translations: &translations, lang, json: false };
        let page = execute(catalog.listings(), query);
        let mut favorites = HashSet::new();
        favorites.insert("act-bamboo-grove".to_string());
        let mut out = Vec::new();
        renderer.page(&mut out, Kind::Activities, &page, &favorites).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_results_render_explicit_message() {
        let text = render(Language::Ja, &Query::new().search("zzz"));
        assert!(text.contains("京都のアクティビティ"));
        assert!(text.contains("条件に一致する結果が見つかりません"));
    }

    #[test]
    fn rows_mark_featured_favorites_and_unrated() {
        let text = render(Language::En, &Query::new());
        let grove = text.lines().find(|l| l.contains("act-bamboo-grove")).unwrap();
        assert!(grove.starts_with('★'));
        assert!(grove.contains("♥ Saved"));
        let temple = text.lines().find(|l| l.contains("act-private-temple")).unwrap();
        assert!(temple.contains("New"));
        assert!(text.starts_with("Things to Do in Kyoto (10 results)"));
    }
}
