//! Home screen: root sections, then the list of sources.
//!
//! Navigation inside the menu is a breadcrumb of sections kept by the state
//! itself. The location survives leaving and re-entering the screen.

use std::time::Instant;

use tracing::warn;

use crate::error::StateError;
use crate::tui::compositor::{Compositor, display_width};
use crate::tui::key::InputEvent;
use crate::tui::state::{AppContext, Payload, State, StateId, Transition};
use crate::tui::theme::{STYLE_BANNER, STYLE_CREATE, STYLE_PLAIN, row};
use crate::tui::toast::{Toast, ToastQueue};
use crate::types::SourceInfo;

use super::{Nav, classify, step, viewport};

const TITLE: &str = "Home";
const PATH_LABEL_ID: &str = "mainMenu.path";
const PATH_ROW: u16 = 1;
const LIST_TOP: u16 = 2;
const NAME_X: u16 = 2;
const NEW_ENTRY: &str = "new";

/// A top-level menu section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Sources,
}

impl Section {
    fn name(self) -> &'static str {
        match self {
            Section::Sources => "sources",
        }
    }
}

const ROOT_SECTIONS: [Section; 1] = [Section::Sources];

#[derive(Debug, Default)]
pub struct MainMenu {
    sources: Vec<SourceInfo>,
    selected: usize,
    location: Vec<Section>,
    toasts: ToastQueue,
}

impl MainMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Breadcrumb such as `/` or `/sources/`.
    pub fn location(&self) -> String {
        let mut path = String::from("/");
        for section in &self.location {
            path.push_str(section.name());
            path.push('/');
        }
        path
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn sources(&self) -> &[SourceInfo] {
        &self.sources
    }

    fn reload(&mut self, ctx: &AppContext) {
        match ctx.catalog.list() {
            Ok(sources) => self.sources = sources,
            Err(e) => {
                warn!(error = %e, "could not list sources");
                self.sources.clear();
                self.toasts.push(Toast::error(e.to_string(), Instant::now()));
            }
        }
    }

    /// Validate the selected source and request the switch to it.
    fn open_selected(&self, ctx: &AppContext) -> Result<Transition, StateError> {
        if self.selected == self.sources.len() {
            return Err(StateError::NotImplemented("creating sources from the menu"));
        }
        let info = self
            .sources
            .get(self.selected)
            .ok_or_else(|| StateError::InvalidSelection("Invalid source".into()))?;
        if !ctx.catalog.exists(&info.id) {
            return Err(StateError::InvalidSelection("Invalid source ID".into()));
        }
        let source = ctx.catalog.open(&info.id, info.meta.clone())?;
        Ok(Transition::to_with(StateId::Source, Payload::OpenSource(source)))
    }

    /// Draws the root sections; returns where the cursor belongs.
    fn render_root(&self, frame: &mut Compositor, visible: usize) -> Option<(u16, u16)> {
        let mut cursor = None;
        let range = viewport(self.selected, ROOT_SECTIONS.len(), visible);
        for (line, i) in range.enumerate() {
            let y = LIST_TOP + line as u16;
            let name = ROOT_SECTIONS[i].name();
            let x = frame.centered_label(name, &row(i == self.selected), y, None);
            if i == self.selected {
                cursor = Some((x + name.len() as u16, y));
            }
        }
        cursor
    }

    /// Draws the source list plus the trailing "new" entry.
    fn render_sources(
        &self,
        ctx: &AppContext,
        frame: &mut Compositor,
        visible: usize,
    ) -> Option<(u16, u16)> {
        let cols = frame.size().cols;
        let name_width = cols.saturating_sub(NAME_X);
        let registry = ctx.catalog.registry();
        let mut cursor = None;

        let range = viewport(self.selected, self.sources.len() + 1, visible);
        for (line, i) in range.enumerate() {
            let y = LIST_TOP + line as u16;
            let style = row(i == self.selected);
            let drawn = match self.sources.get(i) {
                Some(info) => {
                    let indicator = registry.indicator(&info.meta.provider).to_string();
                    frame.label(&indicator, &STYLE_PLAIN, 0, y);
                    let id = format!("mainMenu.source.{}", info.id);
                    let name = &info.meta.name;
                    frame.scrolling_label(name, &id, &style, NAME_X, y, Some(name_width));
                    display_width(name)
                }
                None => {
                    frame.label("+", &STYLE_PLAIN, 0, y);
                    frame.label(NEW_ENTRY, &style.with_foreground(&STYLE_CREATE), NAME_X, y);
                    NEW_ENTRY.len()
                }
            };
            if i == self.selected {
                cursor = Some((NAME_X + (drawn as u16).min(name_width), y));
            }
        }
        cursor
    }
}

impl State for MainMenu {
    fn id(&self) -> StateId {
        StateId::MainMenu
    }

    fn init(&mut self, _ctx: &mut AppContext) {
        *self = MainMenu::new();
    }

    fn enter(&mut self, ctx: &mut AppContext, _payload: Option<Payload>) -> Result<(), StateError> {
        self.toasts.clear();
        self.selected = 0;
        self.reload(ctx);
        Ok(())
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut Compositor) {
        frame.clear();
        frame.banner(TITLE, &STYLE_BANNER);

        let location = self.location();
        frame.scrolling_label(&location, PATH_LABEL_ID, &STYLE_PLAIN, 0, PATH_ROW, None);

        let visible = usize::from(frame.size().rows).saturating_sub(usize::from(LIST_TOP) + 1);
        let cursor = match self.location.last() {
            None => self.render_root(frame, visible),
            Some(Section::Sources) => self.render_sources(ctx, frame, visible),
        };

        self.toasts.render(frame);

        let (x, y) = cursor.unwrap_or((display_width(&location) as u16, PATH_ROW));
        frame.go_to(x, y);
    }

    fn input(
        &mut self,
        ctx: &mut AppContext,
        event: &InputEvent,
    ) -> Result<Transition, StateError> {
        let nav = classify(event);
        if nav == Nav::Quit {
            return Ok(Transition::Quit);
        }

        match self.location.last().copied() {
            None => match nav {
                Nav::Back => return Ok(Transition::Quit),
                Nav::Up | Nav::Down => {
                    self.selected = step(self.selected, ROOT_SECTIONS.len(), nav);
                }
                Nav::Accept => {
                    let section = *ROOT_SECTIONS
                        .get(self.selected)
                        .ok_or_else(|| StateError::InvalidSelection("Invalid section".into()))?;
                    self.location.push(section);
                    self.selected = 0;
                    if section == Section::Sources {
                        self.reload(ctx);
                    }
                }
                _ => {}
            },
            Some(Section::Sources) => match nav {
                Nav::Back => {
                    self.location.pop();
                    self.selected = 0;
                }
                Nav::Up | Nav::Down => {
                    self.selected = step(self.selected, self.sources.len() + 1, nav);
                }
                Nav::Accept => return self.open_selected(ctx),
                _ => {}
            },
        }
        Ok(Transition::Stay)
    }

    fn toasts(&mut self) -> Option<&mut ToastQueue> {
        Some(&mut self.toasts)
    }
}

// ============================================================================
// TESTS
// ============================================================================
