use crate::model::{Recipe, RecipeFolder};

/// Anything listed by title in the front end.
pub trait Titled {
    fn title(&self) -> &str;
}

impl Titled for Recipe {
    fn title(&self) -> &str {
        Recipe::title(self)
    }
}

impl Titled for RecipeFolder {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for String {
    fn title(&self) -> &str {
        self
    }
}

impl Titled for &str {
    fn title(&self) -> &str {
        self
    }
}

/// Case-insensitive substring match on titles. An empty query keeps every
/// item; matches are returned in their original order.
pub fn filter_by_title<'a, T: Titled>(items: &'a [T], query: &str) -> Vec<&'a T> {
    if query.is_empty() {
        return items.iter().collect();
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| title_matches(item.title(), &needle))
        .collect()
}

pub fn matches_query(title: &str, query: &str) -> bool {
    query.is_empty() || title_matches(title, &query.to_lowercase())
}

fn title_matches(title: &str, lowered_needle: &str) -> bool {
    title.to_lowercase().contains(lowered_needle)
}
