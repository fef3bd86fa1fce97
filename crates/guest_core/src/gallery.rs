//! Visible-window and lightbox state for photo galleries.

use shared::{
    domain::{ArchivePhoto, GuestPhoto},
    protocol::{Stored, ALL_CATEGORIES},
};

pub trait GalleryItem {
    /// Stable identity used to follow a photo across filter changes.
    fn key(&self) -> &str;

    fn category(&self) -> Option<&str> {
        None
    }
}

impl GalleryItem for Stored<ArchivePhoto> {
    fn key(&self) -> &str {
        &self.fields.image_url
    }

    fn category(&self) -> Option<&str> {
        Some(&self.fields.category)
    }
}

impl GalleryItem for Stored<GuestPhoto> {
    fn key(&self) -> &str {
        &self.fields.image_url
    }
}

/// Side effects owned by the page while a photo is enlarged.
pub trait LightboxHost {
    fn bind_keys(&mut self);
    fn unbind_keys(&mut self);
    fn set_scroll_lock(&mut self, locked: bool);
}

pub struct NoopHost;

impl LightboxHost for NoopHost {
    fn bind_keys(&mut self) {}
    fn unbind_keys(&mut self) {}
    fn set_scroll_lock(&mut self, _locked: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lightbox {
    Closed,
    Open { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Escape" | "Esc" => Some(Self::Escape),
            "ArrowLeft" | "Left" => Some(Self::ArrowLeft),
            "ArrowRight" | "Right" => Some(Self::ArrowRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    pub initial: usize,
    pub increment: usize,
}

impl PageConfig {
    pub fn new(initial: usize, increment: usize) -> Self {
        Self {
            initial: initial.max(1),
            increment: increment.max(1),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::new(12, 12)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

pub struct GalleryController<P: GalleryItem, H: LightboxHost = NoopHost> {
    items: Vec<P>,
    category: Option<String>,
    /// Positions in `items` passing the category filter, in order.
    filtered: Vec<usize>,
    window: usize,
    pages: PageConfig,
    lightbox: Lightbox,
    host: H,
    generation: u64,
}

impl<P: GalleryItem> GalleryController<P, NoopHost> {
    pub fn new(items: Vec<P>, pages: PageConfig) -> Self {
        Self::with_host(items, pages, NoopHost)
    }
}

impl<P: GalleryItem, H: LightboxHost> GalleryController<P, H> {
    pub fn with_host(items: Vec<P>, pages: PageConfig, host: H) -> Self {
        let mut controller = Self {
            items,
            category: None,
            filtered: Vec::new(),
            window: pages.initial,
            pages,
            lightbox: Lightbox::Closed,
            host,
            generation: 0,
        };
        controller.refilter();
        controller
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn lightbox(&self) -> Lightbox {
        self.lightbox
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn visible_len(&self) -> usize {
        self.window.min(self.filtered.len())
    }

    pub fn has_more(&self) -> bool {
        self.visible_len() < self.filtered.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &P> + '_ {
        self.filtered[..self.visible_len()]
            .iter()
            .map(|&pos| &self.items[pos])
    }

    /// The enlarged photo, if any.
    pub fn current(&self) -> Option<&P> {
        match self.lightbox {
            Lightbox::Open { index } => self.filtered.get(index).map(|&pos| &self.items[pos]),
            Lightbox::Closed => None,
        }
    }

    /// Switches the category filter. `None` or `"all"` shows everything. The
    /// window goes back to the first page; an open lightbox follows its photo
    /// into the new selection or closes if the photo was filtered out.
    pub fn select_category(&mut self, category: Option<&str>) {
        let category = category
            .filter(|c| *c != ALL_CATEGORIES)
            .map(str::to_string);
        let open_key = self.current().map(|p| p.key().to_string());
        self.category = category;
        self.window = self.pages.initial;
        self.refilter();
        self.reattach(open_key);
    }

    /// Grows the window by one increment. No-op once everything is visible.
    pub fn load_more(&mut self) {
        if self.has_more() {
            self.window = self.visible_len() + self.pages.increment;
        }
    }

    /// Replaces the whole collection, e.g. after a reload.
    pub fn set_items(&mut self, items: Vec<P>) {
        let open_key = self.current().map(|p| p.key().to_string());
        self.items = items;
        self.refilter();
        self.reattach(open_key);
    }

    /// Marks the start of a fetch. Only the most recent ticket is honoured by
    /// [`finish_load`](Self::finish_load).
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Applies fetched items unless a newer load has started since. Returns
    /// whether the items were applied.
    pub fn finish_load(&mut self, ticket: LoadTicket, items: Vec<P>) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.set_items(items);
        true
    }

    /// Enlarges the visible photo at `index`. Out-of-range indices are
    /// ignored.
    pub fn open(&mut self, index: usize) -> bool {
        if index >= self.visible_len() {
            return false;
        }
        self.show(index);
        true
    }

    pub fn next(&mut self) {
        if let Lightbox::Open { index } = self.lightbox {
            let len = self.filtered.len();
            self.lightbox = Lightbox::Open {
                index: (index + 1) % len,
            };
        }
    }

    pub fn prev(&mut self) {
        if let Lightbox::Open { index } = self.lightbox {
            let len = self.filtered.len();
            self.lightbox = Lightbox::Open {
                index: (index + len - 1) % len,
            };
        }
    }

    pub fn close(&mut self) {
        if matches!(self.lightbox, Lightbox::Open { .. }) {
            self.lightbox = Lightbox::Closed;
            self.host.unbind_keys();
            self.host.set_scroll_lock(false);
        }
    }

    /// Routes a key press. Returns whether the key was consumed; nothing is
    /// consumed while the lightbox is closed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if self.lightbox == Lightbox::Closed {
            return false;
        }
        match key {
            Key::Escape => self.close(),
            Key::ArrowLeft => self.prev(),
            Key::ArrowRight => self.next(),
        }
        true
    }

    fn show(&mut self, index: usize) {
        if self.lightbox == Lightbox::Closed {
            self.host.bind_keys();
            self.host.set_scroll_lock(true);
        }
        self.lightbox = Lightbox::Open { index };
    }

    fn refilter(&mut self) {
        let category = self.category.as_deref();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| category.is_none() || item.category() == category)
            .map(|(pos, _)| pos)
            .collect();
    }

    fn reattach(&mut self, open_key: Option<String>) {
        let Some(key) = open_key else {
            return;
        };
        let found = self
            .filtered
            .iter()
            .position(|&pos| self.items[pos].key() == key);
        match found {
            Some(index) => self.lightbox = Lightbox::Open { index },
            None => self.close(),
        }
    }
}

impl<P: GalleryItem, H: LightboxHost> Drop for GalleryController<P, H> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Photo {
        url: String,
        category: &'static str,
    }

    impl GalleryItem for Photo {
        fn key(&self) -> &str {
            &self.url
        }

        fn category(&self) -> Option<&str> {
            Some(self.category)
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        bound: i32,
        binds: usize,
        scroll_locked: bool,
    }

    impl LightboxHost for &mut RecordingHost {
        fn bind_keys(&mut self) {
            self.bound += 1;
            self.binds += 1;
        }

        fn unbind_keys(&mut self) {
            self.bound -= 1;
        }

        fn set_scroll_lock(&mut self, locked: bool) {
            self.scroll_locked = locked;
        }
    }

    fn photos(categories: &[&'static str]) -> Vec<Photo> {
        categories
            .iter()
            .copied()
            .enumerate()
            .map(|(i, category)| Photo {
                url: format!("https://cdn.example.com/{i}.jpg"),
                category,
            })
            .collect()
    }

    #[test]
    fn navigation_wraps_in_both_directions() {
        for n in 1..=5 {
            let mut gallery =
                GalleryController::new(photos(&vec!["party"; n]), PageConfig::new(10, 10));
            assert!(gallery.open(n - 1));
            gallery.next();
            assert_eq!(gallery.lightbox(), Lightbox::Open { index: 0 });
            gallery.prev();
            assert_eq!(gallery.lightbox(), Lightbox::Open { index: n - 1 });
        }
    }

    #[test]
    fn open_rejects_indices_outside_visible_window() {
        let mut gallery = GalleryController::new(photos(&["a", "a", "a"]), PageConfig::new(2, 2));
        assert!(!gallery.open(2));
        assert_eq!(gallery.lightbox(), Lightbox::Closed);
        gallery.next();
        assert_eq!(gallery.lightbox(), Lightbox::Closed);
    }

    #[test]
    fn load_more_grows_window_and_stops_at_end() {
        let mut gallery = GalleryController::new(photos(&["a"; 5]), PageConfig::new(2, 2));
        assert_eq!(gallery.visible_len(), 2);
        gallery.load_more();
        assert_eq!(gallery.visible_len(), 4);
        gallery.load_more();
        assert_eq!(gallery.visible_len(), 5);
        assert!(!gallery.has_more());
        gallery.load_more();
        assert_eq!(gallery.visible_len(), 5);
        assert_eq!(gallery.visible().count(), 5);
    }

    #[test]
    fn category_change_resets_window() {
        let mut gallery = GalleryController::new(
            photos(&["party", "ceremony", "party", "party", "party"]),
            PageConfig::new(2, 2),
        );
        gallery.load_more();
        assert_eq!(gallery.visible_len(), 4);

        gallery.select_category(Some("party"));
        assert_eq!(gallery.filtered_len(), 4);
        assert_eq!(gallery.visible_len(), 2);
        assert!(gallery.visible().all(|p| p.category == "party"));

        gallery.select_category(Some(ALL_CATEGORIES));
        assert_eq!(gallery.category(), None);
        assert_eq!(gallery.filtered_len(), 5);
    }

    #[test]
    fn filtering_out_the_open_photo_closes_the_lightbox() {
        let mut host = RecordingHost::default();
        {
            let mut gallery = GalleryController::with_host(
                photos(&["party", "ceremony", "party"]),
                PageConfig::new(10, 10),
                &mut host,
            );
            assert!(gallery.open(1));
            gallery.select_category(Some("party"));
            assert_eq!(gallery.lightbox(), Lightbox::Closed);
        }
        assert_eq!(host.bound, 0);
        assert!(!host.scroll_locked);
    }

    #[test]
    fn open_photo_follows_into_new_filter_by_identity() {
        let mut gallery = GalleryController::new(
            photos(&["ceremony", "party", "ceremony", "party"]),
            PageConfig::new(10, 10),
        );
        assert!(gallery.open(3));
        gallery.select_category(Some("party"));
        assert_eq!(gallery.lightbox(), Lightbox::Open { index: 1 });
        assert_eq!(
            gallery.current().map(|p| p.url.as_str()),
            Some("https://cdn.example.com/3.jpg")
        );
    }

    #[test]
    fn shrinking_collection_closes_dangling_lightbox() {
        let mut gallery = GalleryController::new(photos(&["a", "a", "a"]), PageConfig::new(10, 10));
        assert!(gallery.open(2));
        gallery.set_items(photos(&["a", "a"]));
        assert_eq!(gallery.lightbox(), Lightbox::Closed);
        assert!(gallery.current().is_none());
    }

    #[test]
    fn keys_bind_once_while_open_and_release_on_close() {
        let mut host = RecordingHost::default();
        {
            let mut gallery =
                GalleryController::with_host(photos(&["a", "a"]), PageConfig::new(10, 10), &mut host);
            assert!(!gallery.handle_key(Key::ArrowRight));

            assert!(gallery.open(0));
            assert!(gallery.open(1));
            assert_eq!(gallery.host().bound, 1);
            assert!(gallery.host().scroll_locked);

            assert!(gallery.handle_key(Key::ArrowRight));
            assert_eq!(gallery.lightbox(), Lightbox::Open { index: 0 });
            assert!(gallery.handle_key(Key::ArrowLeft));
            assert_eq!(gallery.lightbox(), Lightbox::Open { index: 1 });
            assert!(gallery.handle_key(Key::Escape));
            assert_eq!(gallery.lightbox(), Lightbox::Closed);
            assert_eq!(gallery.host().bound, 0);
            assert!(!gallery.handle_key(Key::Escape));
        }
        assert_eq!(host.binds, 1);
        assert!(!host.scroll_locked);
    }

    #[test]
    fn dropping_an_open_gallery_releases_keys() {
        let mut host = RecordingHost::default();
        {
            let mut gallery =
                GalleryController::with_host(photos(&["a"]), PageConfig::default(), &mut host);
            gallery.open(0);
        }
        assert_eq!(host.bound, 0);
    }

    #[test]
    fn stale_loads_are_dropped() {
        let mut gallery = GalleryController::new(Vec::<Photo>::new(), PageConfig::default());
        let first = gallery.begin_load();
        let second = gallery.begin_load();
        assert!(!gallery.finish_load(first, photos(&["a"])));
        assert_eq!(gallery.filtered_len(), 0);
        assert!(gallery.finish_load(second, photos(&["a", "b"])));
        assert_eq!(gallery.filtered_len(), 2);
    }

    #[test]
    fn key_names_map_to_bindings() {
        assert_eq!(Key::from_name("Escape"), Some(Key::Escape));
        assert_eq!(Key::from_name("ArrowLeft"), Some(Key::ArrowLeft));
        assert_eq!(Key::from_name("Enter"), None);
    }
}
