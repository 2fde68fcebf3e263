//! Terminal drawing of the viewer
//!
//! Each cell covers [`CELL_WIDTH_PX`] x [`CELL_HEIGHT_PX`] logical pixels and
//! shows two vertically stacked samples of the page raster as a half-block.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::banner::{Banner, BannerLevel};
use crate::event_source::{CELL_HEIGHT_PX, CELL_WIDTH_PX};
use crate::layout::PageElement;
use crate::render::RenderedSurface;
use crate::viewer::Viewer;

const UPPER_HALF_BLOCK: &str = "\u{2580}";
const PLACEHOLDER: &str = "\u{2591}";

const BAR_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Gray);
const FAILED_STYLE: Style = Style::new().fg(Color::Red).bg(Color::Black);
const PENDING_STYLE: Style = Style::new().fg(Color::DarkGray).bg(Color::Black);

/// Part of `area` given to the page strip
pub fn pages_area(area: Rect, show_controls: bool) -> Rect {
    if show_controls && area.height > 1 {
        Rect {
            height: area.height - 1,
            ..area
        }
    } else {
        area
    }
}

/// Logical pixel size of a page area
pub fn container_size(area: Rect) -> (f32, f32) {
    (
        f32::from(area.width) * CELL_WIDTH_PX,
        f32::from(area.height) * CELL_HEIGHT_PX,
    )
}

/// Draws the page strip, the controls bar and the banner
pub struct ViewerWidget<'a> {
    viewer: &'a Viewer,
}

impl<'a> ViewerWidget<'a> {
    pub fn new(viewer: &'a Viewer) -> Self {
        Self { viewer }
    }
}

impl Widget for ViewerWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let show_controls = self.viewer.config().show_controls;
        let pages = pages_area(area, show_controls);

        render_pages(self.viewer, pages, buf);

        if show_controls && pages.height < area.height {
            let bar = Rect {
                y: area.bottom() - 1,
                height: 1,
                ..area
            };
            controls_line(self.viewer).render(bar, buf);
        }

        if let Some(banner) = self.viewer.banner() {
            let row = Rect { height: 1, ..pages };
            banner_line(banner).render(row, buf);
        }
    }
}

fn render_pages(viewer: &Viewer, area: Rect, buf: &mut Buffer) {
    let scroll = viewer.state().scroll_offset;
    let area = area.intersection(*buf.area());

    for column in 0..area.width {
        let x = scroll + (f32::from(column) + 0.5) * CELL_WIDTH_PX;
        let Some(element) = viewer.elements().iter().find(|e| x >= e.x && x < e.right()) else {
            continue;
        };

        for row in 0..area.height {
            let top = f32::from(row) * CELL_HEIGHT_PX + CELL_HEIGHT_PX * 0.25;
            let bottom = top + CELL_HEIGHT_PX * 0.5;
            if top >= element.height {
                break;
            }

            let cell = &mut buf[(area.x + column, area.y + row)];
            match viewer.surface(element.page) {
                Some(surface) => {
                    let upper = sample(surface, element, x, top).unwrap_or(Color::Reset);
                    let lower = sample(surface, element, x, bottom).unwrap_or(Color::Reset);
                    cell.set_symbol(UPPER_HALF_BLOCK).set_fg(upper).set_bg(lower);
                }
                None if viewer.failed_pages().contains_key(&element.page) => {
                    cell.set_symbol("x").set_style(FAILED_STYLE);
                }
                None => {
                    cell.set_symbol(PLACEHOLDER).set_style(PENDING_STYLE);
                }
            }
        }
    }
}

/// Color of the raster under logical point `(x, y)` of the strip
fn sample(surface: &RenderedSurface, element: &PageElement, x: f32, y: f32) -> Option<Color> {
    if element.width <= 0.0 || element.height <= 0.0 || y < 0.0 || y >= element.height {
        return None;
    }
    let image = &surface.image;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let px = (((x - element.x) / element.width) * width as f32) as u32;
    let py = ((y / element.height) * height as f32) as u32;
    let [r, g, b] = image.get_pixel(px.min(width - 1), py.min(height - 1)).0;
    Some(Color::Rgb(r, g, b))
}

fn controls_line(viewer: &Viewer) -> Line<'static> {
    let state = viewer.state();
    if !viewer.is_loaded() {
        return Line::from(Span::styled(" no document ", BAR_STYLE)).style(BAR_STYLE);
    }

    let mut spans = vec![
        Span::styled(
            format!(" {} / {} ", viewer.displayed_page(), state.total_pages),
            BAR_STYLE.add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("| {} ", state.mode.as_str()), BAR_STYLE),
        Span::styled(format!("| {:.0}% ", state.zoom * 100.0), BAR_STYLE),
    ];
    if viewer.is_rendering() {
        spans.push(Span::styled("| rendering ", BAR_STYLE.fg(Color::DarkGray)));
    }
    spans.push(Span::styled(
        "| \u{2190}/\u{2192} page  +/- zoom  m mode  r refresh  q quit",
        BAR_STYLE,
    ));
    Line::from(spans).style(BAR_STYLE)
}

fn banner_line(banner: &Banner) -> Line<'static> {
    let style = match banner.level {
        BannerLevel::Info => Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD),
        BannerLevel::Error => Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    };

    Line::from(vec![Span::styled(format!(" {} ", banner.message), style)]).centered()
}
