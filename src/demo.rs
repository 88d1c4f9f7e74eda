//! Demo application screens drawn on the software [`Canvas`].
//!
//! These exist to be captured: a small dashboard app with mock data, laid out
//! in logical points and scaled by the device density so every preset gives
//! a deterministic image. [`demo_registry`] lists the scenarios the CLI runs.

use std::sync::Arc;

use crate::harness::{Registry, Scenario};
use crate::snapshot::{
    Canvas, CaptureConfiguration, ColorScheme, DeviceProfile, Image, RenderError, Renderable,
};

pub type Rgb = [u8; 3];

pub const GREEN: Rgb = [52, 199, 89];
pub const BLUE: Rgb = [0, 122, 255];
pub const PURPLE: Rgb = [175, 82, 222];
pub const ORANGE: Rgb = [255, 149, 0];
pub const RED: Rgb = [255, 59, 48];
pub const YELLOW: Rgb = [255, 204, 0];
pub const GRAY: Rgb = [142, 142, 147];
pub const WHITE: Rgb = [255, 255, 255];

/// Dashboard metrics: title, value, trend, accent
pub const METRICS: [(&str, &str, &str, Rgb); 4] = [
    ("Total Sales", "$12,345", "+12%", GREEN),
    ("New Users", "1,234", "+8%", BLUE),
    ("Revenue", "$45,678", "+15%", PURPLE),
    ("Orders", "567", "-2%", ORANGE),
];

/// Weekly analytics series shown as a bar chart
pub const CHART_DATA: [u32; 7] = [30, 45, 35, 60, 55, 70, 65];

const ACTIVITY: [(&str, &str, Rgb); 5] = [
    ("New Order #1234", "1m ago", GREEN),
    ("User Registration", "3m ago", BLUE),
    ("Payment Received", "7m ago", PURPLE),
    ("System Alert", "13m ago", ORANGE),
    ("5-Star Review", "19m ago", YELLOW),
];

const CATEGORIES: [&str; 5] = ["All", "Electronics", "Clothing", "Books", "Home"];

/// Sample catalog: name, price, accent, favorite
const PRODUCTS: [(&str, &str, Rgb, bool); 10] = [
    ("iPhone 15 Pro", "$999", BLUE, true),
    ("MacBook Air", "$1299", GRAY, false),
    ("Cotton T-Shirt", "$29", GREEN, true),
    ("Swift Programming", "$49", ORANGE, false),
    ("Coffee Mug", "$19", [162, 132, 94], false),
    ("AirPods Pro", "$249", BLUE, true),
    ("Denim Jeans", "$79", [88, 86, 214], false),
    ("Cooking Guide", "$35", RED, true),
    ("Table Lamp", "$89", YELLOW, false),
    ("iPad Pro", "$1099", PURPLE, false),
];

const ACHIEVEMENTS: [(&str, Rgb, bool); 6] = [
    ("First Post", YELLOW, true),
    ("100 Likes", RED, true),
    ("1K Followers", BLUE, true),
    ("Streak Master", ORANGE, false),
    ("Top Creator", PURPLE, false),
    ("Champion", [212, 175, 55], false),
];

const SETTINGS: [(&str, &[(&str, &str)]); 8] = [
    (
        "Account",
        &[
            ("Edit Profile", "Update your profile information"),
            ("Change Password", "Update your password"),
            ("Payment Methods", "Manage payment options"),
        ],
    ),
    (
        "Privacy & Security",
        &[
            ("Face ID", "Use Face ID to unlock the app"),
            ("Privacy Settings", "Control who can see your data"),
            ("Security Checkup", "Review your security settings"),
        ],
    ),
    (
        "Notifications",
        &[
            ("Push Notifications", "Receive push notifications"),
            ("Email Notifications", "Configure email preferences"),
        ],
    ),
    (
        "Appearance",
        &[("Dark Mode", "Use dark appearance"), ("Theme", "Choose app theme")],
    ),
    (
        "Data & Storage",
        &[
            ("Auto Sync", "Automatically sync data"),
            ("Storage", "Cache: 124 MB"),
            ("Clear Cache", "Free up space"),
        ],
    ),
    (
        "General",
        &[
            ("Language", "Choose your language"),
            ("Help & Support", "Get help and contact support"),
            ("Terms of Service", "Read our terms"),
            ("Privacy Policy", "Read our privacy policy"),
        ],
    ),
    (
        "About",
        &[("Version", "1.0.0 (Build 123)"), ("Rate App", "Rate us in the App Store")],
    ),
    ("Account Actions", &[("Sign Out", "")]),
];

/// Colors for one color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub surface: Rgb,
    pub text: Rgb,
    pub secondary: Rgb,
    pub divider: Rgb,
}

impl Palette {
    pub fn for_scheme(scheme: ColorScheme) -> Self {
        match scheme {
            ColorScheme::Light => Palette {
                background: [242, 242, 247],
                surface: WHITE,
                text: [0, 0, 0],
                secondary: [110, 110, 115],
                divider: [209, 209, 214],
            },
            ColorScheme::Dark => Palette {
                background: [0, 0, 0],
                surface: [28, 28, 30],
                text: WHITE,
                secondary: [152, 152, 157],
                divider: [56, 56, 58],
            },
        }
    }
}

/// Draws in logical points onto a canvas sized for the device
struct Painter {
    canvas: Canvas,
    scale: u32,
    palette: Palette,
}

impl Painter {
    fn new(config: &CaptureConfiguration) -> Result<Self, RenderError> {
        let (w, h) = config.device.pixel_size();
        if w == 0 || h == 0 {
            return Err(RenderError::new(format!(
                "device '{}' has no drawable area",
                config.device.name
            )));
        }
        let palette = Palette::for_scheme(config.color_scheme);
        Ok(Self {
            canvas: Canvas::with_color(w, h, palette.background),
            scale: config.device.scale.max(1),
            palette,
        })
    }

    /// Logical width
    fn width(&self) -> u32 {
        self.canvas.width() / self.scale
    }

    fn height(&self) -> u32 {
        self.canvas.height() / self.scale
    }

    fn px(&self, points: u32) -> u32 {
        points.saturating_mul(self.scale)
    }

    fn rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        let (x, y, w, h) = (self.px(x), self.px(y), self.px(w), self.px(h));
        self.canvas.draw_rect(x, y, w, h, color);
    }

    fn frame(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        let (x, y, w, h, t) = (self.px(x), self.px(y), self.px(w), self.px(h), self.px(1));
        self.canvas.draw_frame(x, y, w, h, t, color);
    }

    /// `size` is the glyph multiplier; 1 gives 8pt text
    fn text(&mut self, x: u32, y: u32, text: &str, size: u32, color: Rgb) {
        let (x, y, scale) = (self.px(x), self.px(y), self.px(size));
        self.canvas.draw_text(x, y, text, scale, color);
    }

    fn text_right(&mut self, right: u32, y: u32, text: &str, size: u32, color: Rgb) {
        let w = Canvas::text_width(text, size);
        self.text(right.saturating_sub(w), y, text, size, color);
    }

    fn card(&mut self, x: u32, y: u32, w: u32, h: u32) {
        self.rect(x, y, w, h, self.palette.surface);
        self.frame(x, y, w, h, self.palette.divider);
    }

    /// Large navigation title; returns the y below it
    fn nav_title(&mut self, title: &str) -> u32 {
        self.text(16, 24, title, 3, self.palette.text);
        64
    }

    fn finish(self) -> Image {
        self.canvas.into_image()
    }
}

/// Top-level screens of the demo app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Tab container showing the dashboard
    Content,
    Dashboard,
    Products,
    Profile,
    Settings,
}

impl Screen {
    fn paint(&self, p: &mut Painter) {
        match self {
            Screen::Content => {
                paint_dashboard(p);
                paint_tab_bar(p, 0);
            }
            Screen::Dashboard => paint_dashboard(p),
            Screen::Products => paint_products(p),
            Screen::Profile => paint_profile(p),
            Screen::Settings => paint_settings(p),
        }
    }
}

impl Renderable for Screen {
    fn render(&self, config: &CaptureConfiguration) -> Result<Image, RenderError> {
        let mut painter = Painter::new(config)?;
        self.paint(&mut painter);
        Ok(painter.finish())
    }
}

fn paint_tab_bar(p: &mut Painter, selected: usize) {
    const TABS: [&str; 4] = ["Home", "Products", "Profile", "Settings"];
    let (w, h) = (p.width(), p.height());
    let top = h.saturating_sub(56);
    p.rect(0, top, w, 56, p.palette.surface);
    p.rect(0, top, w, 1, p.palette.divider);

    let slot = w / TABS.len() as u32;
    for (i, label) in TABS.iter().enumerate() {
        let color = if i == selected { BLUE } else { GRAY };
        let center = slot * i as u32 + slot / 2;
        p.rect(center.saturating_sub(8), top + 8, 16, 16, color);
        let tw = Canvas::text_width(label, 1);
        p.text(center.saturating_sub(tw / 2), top + 32, label, 1, color);
    }
}

fn paint_metric(p: &mut Painter, x: u32, y: u32, w: u32, h: u32, metric: (&str, &str, &str, Rgb)) {
    let (title, value, trend, accent) = metric;
    p.card(x, y, w, h);
    p.rect(x, y, 4, h, accent);
    p.text(x + 12, y + 12, title, 1, p.palette.secondary);
    p.text(x + 12, y + 28, value, 2, p.palette.text);
    let trend_color = if trend.starts_with('-') { RED } else { GREEN };
    p.text(x + 12, y + h.saturating_sub(20), trend, 1, trend_color);
}

fn paint_dashboard(p: &mut Painter) {
    let w = p.width();
    let inner = w.saturating_sub(32);
    let mut y = p.nav_title("Dashboard");

    p.card(16, y, inner, 56);
    p.text(28, y + 12, "Welcome back!", 1, p.palette.secondary);
    p.text(28, y + 28, "John Doe", 2, p.palette.text);
    p.rect(16 + inner.saturating_sub(52), y + 8, 40, 40, BLUE);
    y += 72;

    let cell = inner.saturating_sub(12) / 2;
    for (i, metric) in METRICS.iter().enumerate() {
        let col = (i % 2) as u32;
        let row = (i / 2) as u32;
        paint_metric(p, 16 + col * (cell + 12), y + row * 100, cell, 88, *metric);
    }
    y += 200;

    p.card(16, y, inner, 160);
    p.text(28, y + 12, "Analytics", 2, p.palette.text);
    p.text_right(16 + inner - 12, y + 16, "Revenue", 1, BLUE);
    let max = CHART_DATA.iter().copied().max().unwrap_or(1).max(1);
    let bar_w = inner.saturating_sub(24) / CHART_DATA.len() as u32;
    let base = y + 148;
    for (i, value) in CHART_DATA.iter().enumerate() {
        let bar_h = value * 100 / max;
        let x = 28 + i as u32 * bar_w;
        p.rect(x, base - bar_h, bar_w.saturating_sub(6), bar_h, BLUE);
    }
    y += 176;

    p.card(16, y, inner, 40 + ACTIVITY.len() as u32 * 36);
    p.text(28, y + 12, "Recent Activity", 2, p.palette.text);
    for (i, (title, time, color)) in ACTIVITY.iter().enumerate() {
        let row = y + 40 + i as u32 * 36;
        p.rect(28, row + 4, 20, 20, *color);
        p.text(60, row + 10, title, 1, p.palette.text);
        p.text_right(16 + inner - 12, row + 10, time, 1, p.palette.secondary);
    }
}

fn paint_products(p: &mut Painter) {
    let w = p.width();
    let inner = w.saturating_sub(32);
    let mut y = p.nav_title("Products");
    p.rect(w.saturating_sub(40), 28, 16, 16, GRAY);

    p.card(16, y, inner, 36);
    p.text(28, y + 14, "Search products...", 1, p.palette.secondary);
    y += 48;

    let mut x = 16;
    for (i, category) in CATEGORIES.iter().enumerate() {
        let chip = Canvas::text_width(category, 1) + 24;
        if i == 0 {
            p.rect(x, y, chip, 24, BLUE);
            p.text(x + 12, y + 8, category, 1, WHITE);
        } else {
            p.card(x, y, chip, 24);
            p.text(x + 12, y + 8, category, 1, p.palette.text);
        }
        x += chip + 12;
    }
    y += 40;

    let cell = inner.saturating_sub(16) / 2;
    for (i, (name, price, color, favorite)) in PRODUCTS.iter().enumerate() {
        let col = (i % 2) as u32;
        let row = (i / 2) as u32;
        let (cx, cy) = (16 + col * (cell + 16), y + row * 136);
        p.card(cx, cy, cell, 120);
        p.rect(cx + 8, cy + 8, cell.saturating_sub(16), 60, *color);
        p.text(cx + 8, cy + 80, name, 1, p.palette.text);
        p.text(cx + 8, cy + 96, price, 1, BLUE);
        if *favorite {
            p.rect(cx + cell.saturating_sub(20), cy + 96, 8, 8, RED);
        }
    }
}

fn paint_profile(p: &mut Painter) {
    let w = p.width();
    let inner = w.saturating_sub(32);
    let mut y = p.nav_title("Profile");

    let avatar_x = (w / 2).saturating_sub(40);
    p.rect(avatar_x, y, 80, 80, PURPLE);
    p.frame(avatar_x, y, 80, 80, WHITE);
    p.text(avatar_x + 24, y + 32, "JD", 2, WHITE);
    y += 96;

    for (text, size, color) in [
        ("John Doe", 2, p.palette.text),
        ("john.doe@example.com", 1, p.palette.secondary),
        ("iOS Developer passionate about", 1, p.palette.secondary),
        ("creating beautiful apps", 1, p.palette.secondary),
    ] {
        let tw = Canvas::text_width(text, size);
        p.text((w / 2).saturating_sub(tw / 2), y, text, size, color);
        y += 8 * size + 8;
    }
    y += 8;

    p.card(16, y, inner, 56);
    let slot = inner / 3;
    for (i, (label, value)) in [("Posts", "127"), ("Followers", "1.2K"), ("Following", "456")]
        .iter()
        .enumerate()
    {
        let center = 16 + slot * i as u32 + slot / 2;
        let vw = Canvas::text_width(value, 2);
        let lw = Canvas::text_width(label, 1);
        p.text(center.saturating_sub(vw / 2), y + 10, value, 2, p.palette.text);
        p.text(center.saturating_sub(lw / 2), y + 34, label, 1, p.palette.secondary);
    }
    y += 72;

    p.text(16, y, "Achievements", 2, p.palette.text);
    y += 24;
    let badge = inner.saturating_sub(24) / 3;
    for (i, (title, color, unlocked)) in ACHIEVEMENTS.iter().enumerate() {
        let col = (i % 3) as u32;
        let row = (i / 3) as u32;
        let (bx, by) = (16 + col * (badge + 12), y + row * 72);
        let fill = if *unlocked { *color } else { p.palette.divider };
        p.card(bx, by, badge, 60);
        p.rect((bx + badge / 2).saturating_sub(12), by + 8, 24, 24, fill);
        let tw = Canvas::text_width(title, 1);
        p.text((bx + badge / 2).saturating_sub(tw / 2), by + 42, title, 1, p.palette.text);
    }
    y += 152;

    p.text(16, y, "Recent Activity", 2, p.palette.text);
    y += 24;
    for (title, time, color) in [
        ("Posted a new photo", "2 hours ago", GREEN),
        ("Liked 5 posts", "4 hours ago", RED),
        ("Commented on a post", "6 hours ago", BLUE),
        ("Followed 3 users", "1 day ago", PURPLE),
    ] {
        p.rect(16, y, 20, 20, color);
        p.text(48, y + 2, title, 1, p.palette.text);
        p.text(48, y + 14, time, 1, p.palette.secondary);
        y += 32;
    }
}

fn paint_settings(p: &mut Painter) {
    let w = p.width();
    let inner = w.saturating_sub(32);
    let mut y = p.nav_title("Settings");

    for (section, rows) in SETTINGS {
        p.text(24, y, &section.to_uppercase(), 1, p.palette.secondary);
        y += 14;
        p.card(16, y, inner, rows.len() as u32 * 36);
        for (i, (title, subtitle)) in rows.iter().enumerate() {
            let row = y + i as u32 * 36;
            if i > 0 {
                p.rect(52, row, inner.saturating_sub(36), 1, p.palette.divider);
            }
            let color = if *title == "Sign Out" { RED } else { p.palette.text };
            p.rect(24, row + 8, 20, 20, if *title == "Sign Out" { RED } else { BLUE });
            p.text(52, row + 8, title, 1, color);
            p.text(52, row + 20, subtitle, 1, p.palette.secondary);
        }
        y += rows.len() as u32 * 36 + 16;
    }
}

/// A single metric tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub trend: String,
    pub accent: Rgb,
}

impl MetricCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, trend: impl Into<String>, accent: Rgb) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            trend: trend.into(),
            accent,
        }
    }
}

impl Renderable for MetricCard {
    fn render(&self, config: &CaptureConfiguration) -> Result<Image, RenderError> {
        let mut p = Painter::new(config)?;
        let (w, h) = (p.width(), p.height());
        paint_metric(
            &mut p,
            8,
            8,
            w.saturating_sub(16),
            h.saturating_sub(16),
            (self.title.as_str(), self.value.as_str(), self.trend.as_str(), self.accent),
        );
        Ok(p.finish())
    }
}

/// Centered line of text, optionally on a solid background
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBanner {
    pub text: String,
    pub size: u32,
    pub color: Rgb,
    pub background: Option<Rgb>,
}

impl TextBanner {
    pub fn new(text: impl Into<String>, size: u32, color: Rgb) -> Self {
        Self {
            text: text.into(),
            size: size.max(1),
            color,
            background: None,
        }
    }

    pub fn background(mut self, color: Rgb) -> Self {
        self.background = Some(color);
        self
    }
}

impl Renderable for TextBanner {
    fn render(&self, config: &CaptureConfiguration) -> Result<Image, RenderError> {
        let mut p = Painter::new(config)?;
        let (w, h) = (p.width(), p.height());
        if let Some(bg) = self.background {
            p.rect(0, 0, w, h, bg);
        }
        let tw = Canvas::text_width(&self.text, self.size);
        let th = 8 * self.size;
        p.text(
            (w / 2).saturating_sub(tw / 2),
            (h / 2).saturating_sub(th / 2),
            &self.text,
            self.size,
            self.color,
        );
        Ok(p.finish())
    }
}

/// Every demo scenario, with full-screen views on `base`'s device and
/// components on fixed frames. Thresholds come from `base`.
pub fn demo_registry(base: &CaptureConfiguration) -> Registry {
    let fixed = |w, h| CaptureConfiguration {
        device: DeviceProfile::fixed(w, h),
        ..base.clone()
    };
    let dark = base.clone().color_scheme(ColorScheme::Dark);

    let mut registry = Registry::new();
    registry
        .register(
            Scenario::new("WorkingSnapshotTests", "ContentView Snapshot", Arc::new(Screen::Content))
                .configuration(base.clone()),
        )
        .register(
            Scenario::new("WorkingSnapshotTests", "ContentView Dark Mode", Arc::new(Screen::Content))
                .configuration(dark.clone()),
        )
        .register(
            Scenario::new("WorkingSnapshotTests", "Settings View Dark Mode", Arc::new(Screen::Settings))
                .configuration(dark),
        )
        .register(
            Scenario::new("WorkingSnapshotTests", "Dashboard View", Arc::new(Screen::Dashboard))
                .configuration(base.clone()),
        )
        .register(
            Scenario::new("WorkingSnapshotTests", "Products View", Arc::new(Screen::Products))
                .configuration(base.clone()),
        )
        .register(
            Scenario::new("WorkingSnapshotTests", "Profile View", Arc::new(Screen::Profile))
                .configuration(base.clone()),
        )
        .register(
            Scenario::new(
                "WorkingSnapshotTests",
                "MetricCard Component",
                Arc::new(MetricCard::new("Total Revenue", "$24,567", "+12.5%", GREEN)),
            )
            .configuration(fixed(300, 120)),
        )
        .register(
            Scenario::new(
                "SimpleWorkingTests",
                "Basic Text Snapshot",
                Arc::new(TextBanner::new("ScreenshotBot Demo", 3, BLUE)),
            )
            .configuration(fixed(480, 64)),
        )
        .register(
            Scenario::new(
                "MinimalSnapshotTest",
                "Simple Text View",
                Arc::new(TextBanner::new("Hello ScreenshotBot!", 2, WHITE).background(BLUE)),
            )
            .configuration(fixed(360, 60)),
        );
    registry
}
