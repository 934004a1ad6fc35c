//! Source screen: the projects of one source, and the files of one project.

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::StateError;
use crate::source::Source;
use crate::tui::compositor::{Compositor, display_width};
use crate::tui::key::InputEvent;
use crate::tui::state::{AppContext, Payload, State, StateId, Transition};
use crate::tui::theme::{STYLE_BANNER, STYLE_CREATE, STYLE_DIM, row};
use crate::tui::toast::{Toast, ToastQueue};
use crate::types::{Project, ProjectSummary};

use super::{Nav, classify, step, viewport};

const LIST_TOP: u16 = 1;
const NEW_ENTRY: &str = "new";
const EMPTY_PROJECT: &str = "(no files)";

#[derive(Debug, Default)]
pub struct SourceScreen {
    source: Option<Source>,
    projects: Vec<ProjectSummary>,
    /// Project whose files are shown, if one was opened.
    loaded: Option<Project>,
    selected: usize,
    file_selected: usize,
    toasts: ToastQueue,
}

impl SourceScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn projects(&self) -> &[ProjectSummary] {
        &self.projects
    }

    pub fn loaded_project(&self) -> Option<&Project> {
        self.loaded.as_ref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn load_selected(&mut self) -> Result<(), StateError> {
        if self.selected == self.projects.len() {
            return Err(StateError::NotImplemented("creating projects"));
        }
        let (Some(source), Some(summary)) = (&self.source, self.projects.get(self.selected)) else {
            return Err(StateError::InvalidSelection("Invalid project".into()));
        };
        let project = source
            .get_project(&summary.id)?
            .ok_or_else(|| {
                StateError::InvalidSelection(format!("Project {} no longer exists", summary.name))
            })?;
        debug!(project = %project.id, files = project.files.len(), "project loaded");
        self.loaded = Some(project);
        self.file_selected = 0;
        Ok(())
    }

    /// Project names plus the trailing "new" entry.
    fn render_projects(&self, frame: &mut Compositor, visible: usize) -> (u16, u16) {
        let mut cursor = (0, LIST_TOP);
        let range = viewport(self.selected, self.projects.len() + 1, visible);
        for (line, i) in range.enumerate() {
            let y = LIST_TOP + line as u16;
            let style = row(i == self.selected);
            let drawn = match self.projects.get(i) {
                Some(project) => {
                    let id = format!("source.project.{}", project.id);
                    frame.scrolling_label(&project.name, &id, &style, 0, y, None);
                    display_width(&project.name)
                }
                None => {
                    frame.label(NEW_ENTRY, &style.with_foreground(&STYLE_CREATE), 0, y);
                    NEW_ENTRY.len()
                }
            };
            if i == self.selected {
                cursor = ((drawn as u16).min(frame.size().cols), y);
            }
        }
        cursor
    }

    /// Files of the loaded project.
    fn render_files(
        &self,
        project: &Project,
        frame: &mut Compositor,
        visible: usize,
    ) -> (u16, u16) {
        if project.files.is_empty() {
            frame.label(EMPTY_PROJECT, &STYLE_DIM, 0, LIST_TOP);
            return (0, LIST_TOP);
        }

        let mut cursor = (0, LIST_TOP);
        let range = viewport(self.file_selected, project.files.len(), visible);
        for (line, i) in range.enumerate() {
            let y = LIST_TOP + line as u16;
            let file = &project.files[i];
            let id = format!("source.file.{}", file.name);
            frame.scrolling_label(&file.name, &id, &row(i == self.file_selected), 0, y, None);
            if i == self.file_selected {
                cursor = ((display_width(&file.name) as u16).min(frame.size().cols), y);
            }
        }
        cursor
    }
}

impl State for SourceScreen {
    fn id(&self) -> StateId {
        StateId::Source
    }

    fn init(&mut self, _ctx: &mut AppContext) {
        *self = SourceScreen::new();
    }

    fn enter(&mut self, ctx: &mut AppContext, payload: Option<Payload>) -> Result<(), StateError> {
        let source = match payload {
            Some(Payload::OpenSource(source)) => source,
            None => {
                return Err(StateError::BadPayload {
                    state: StateId::Source.name(),
                    reason: "expected an open source",
                });
            }
        };

        ctx.settings.remember_source(&source.id);

        self.toasts.clear();
        self.loaded = None;
        self.selected = 0;
        self.file_selected = 0;
        self.projects = match source.list_projects() {
            Ok(projects) => projects,
            Err(e) => {
                warn!(source = %source.id, error = %e, "could not list projects");
                self.toasts.push(Toast::error(e.to_string(), Instant::now()));
                Vec::new()
            }
        };
        self.source = Some(source);
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut AppContext, _payload: Option<Payload>) -> Result<(), StateError> {
        self.loaded = None;
        Ok(())
    }

    fn render(&mut self, _ctx: &AppContext, frame: &mut Compositor) {
        frame.clear();
        let Some(source) = &self.source else {
            return;
        };
        frame.banner(source.name(), &STYLE_BANNER);

        let visible = usize::from(frame.size().rows).saturating_sub(usize::from(LIST_TOP) + 1);
        let (x, y) = match &self.loaded {
            None => self.render_projects(frame, visible),
            Some(project) => self.render_files(project, frame, visible),
        };

        self.toasts.render(frame);
        frame.go_to(x, y);
    }

    fn input(
        &mut self,
        _ctx: &mut AppContext,
        event: &InputEvent,
    ) -> Result<Transition, StateError> {
        let nav = classify(event);
        let loaded_files = self.loaded.as_ref().map(|project| project.files.len());
        match (nav, loaded_files) {
            (Nav::Quit, _) => return Ok(Transition::Quit),
            (Nav::Back, Some(_)) => self.loaded = None,
            (Nav::Back, None) => return Ok(Transition::to(StateId::MainMenu)),
            (Nav::Up | Nav::Down, Some(files)) => {
                self.file_selected = step(self.file_selected, files, nav);
            }
            (Nav::Up | Nav::Down, None) => {
                self.selected = step(self.selected, self.projects.len() + 1, nav);
            }
            (Nav::Accept, None) => self.load_selected()?,
            _ => {}
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::provider::{PROJECTS_DIR, ProviderRegistry};
    use crate::settings::SettingsStore;
    use crate::source::SourceCatalog;
    use crate::tui::compositor::TermSize;

    const UP: &str = "\x1b[A";
    const DOWN: &str = "\x1b[B";
    const BACKSPACE: &str = "\x7f";

    struct Fixture {
        _tmp: TempDir,
        ctx: AppContext,
        id: String,
    }

    /// A catalog with one local source named "Work" holding `projects`,
    /// each with the given files.
    fn fixture(projects: &[(&str, &[&str])]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let settings = SettingsStore::load_or_create(tmp.path().join("settings.json"));
        let catalog = SourceCatalog::new(tmp.path().join("sources"), ProviderRegistry::builtin());
        let id = catalog.create("Work", "local").unwrap();
        for (project, files) in projects {
            let dir = catalog.source_dir(&id).join(PROJECTS_DIR).join(project);
            fs::create_dir_all(&dir).unwrap();
            for file in *files {
                fs::write(dir.join(file), "x").unwrap();
            }
        }
        Fixture {
            _tmp: tmp,
            ctx: AppContext::new(settings, catalog),
            id,
        }
    }

    fn entered(fx: &mut Fixture) -> SourceScreen {
        let source = fx.ctx.catalog.open_by_id(&fx.id).unwrap();
        let mut screen = SourceScreen::new();
        screen.init(&mut fx.ctx);
        screen.enter(&mut fx.ctx, Some(Payload::OpenSource(source))).unwrap();
        screen
    }

    fn input(
        screen: &mut SourceScreen,
        fx: &mut Fixture,
        event: InputEvent,
    ) -> Result<Transition, StateError> {
        screen.input(&mut fx.ctx, &event)
    }

    // -- Enter --

    #[test]
    fn enter_without_payload_is_rejected() {
        let mut fx = fixture(&[]);
        let mut screen = SourceScreen::new();
        let err = screen.enter(&mut fx.ctx, None).unwrap_err();
        assert!(matches!(err, StateError::BadPayload { state: "source", .. }));
        assert!(screen.source().is_none());
    }

    #[test]
    fn enter_remembers_source_and_lists_projects() {
        let mut fx = fixture(&[("blog", &[]), ("api", &[])]);
        let screen = entered(&mut fx);

        assert_eq!(fx.ctx.settings.last_source_id(), Some(fx.id.as_str()));
        let names: Vec<_> = screen.projects().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["api", "blog"]);
    }

    // -- Navigation --

    #[test]
    fn backspace_returns_to_main_menu() {
        let mut fx = fixture(&[]);
        let mut screen = entered(&mut fx);
        let transition = input(&mut screen, &mut fx, InputEvent::key(BACKSPACE)).unwrap();
        assert!(matches!(
            transition,
            Transition::Switch { target: StateId::MainMenu, enter: None, exit: None }
        ));
    }

    #[test]
    fn list_wraps_through_new_entry() {
        let mut fx = fixture(&[("a", &[]), ("b", &[])]);
        let mut screen = entered(&mut fx);

        input(&mut screen, &mut fx, InputEvent::key(UP)).unwrap();
        assert_eq!(screen.selected(), 2);
        input(&mut screen, &mut fx, InputEvent::key(DOWN)).unwrap();
        assert_eq!(screen.selected(), 0);
    }

    #[test]
    fn enter_loads_project_and_backspace_unloads() {
        let mut fx = fixture(&[("site", &["b.md", "a.md"])]);
        let mut screen = entered(&mut fx);

        input(&mut screen, &mut fx, InputEvent::text("\r")).unwrap();
        let files: Vec<_> = screen
            .loaded_project()
            .unwrap()
            .files
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(files, vec!["a.md", "b.md"]);

        let transition = input(&mut screen, &mut fx, InputEvent::key(BACKSPACE)).unwrap();
        assert!(matches!(transition, Transition::Stay));
        assert!(screen.loaded_project().is_none());
    }

    #[test]
    fn new_project_is_not_implemented() {
        let mut fx = fixture(&[]);
        let mut screen = entered(&mut fx);
        let err = input(&mut screen, &mut fx, InputEvent::text("\r")).unwrap_err();
        assert!(matches!(err, StateError::NotImplemented(_)));
    }

    #[test]
    fn vanished_project_is_invalid() {
        let mut fx = fixture(&[("gone", &[])]);
        let mut screen = entered(&mut fx);
        let dir = fx.ctx.catalog.source_dir(&fx.id).join(PROJECTS_DIR).join("gone");
        fs::remove_dir_all(dir).unwrap();

        let err = input(&mut screen, &mut fx, InputEvent::text("\r")).unwrap_err();

        assert!(matches!(err, StateError::InvalidSelection(_)));
        assert!(screen.loaded_project().is_none());
    }

    #[test]
    fn ctrl_c_quits() {
        let mut fx = fixture(&[]);
        let mut screen = entered(&mut fx);
        let transition = input(&mut screen, &mut fx, InputEvent::key("\x03")).unwrap();
        assert!(matches!(transition, Transition::Quit));
    }

    // -- Rendering --

    #[test]
    fn renders_banner_projects_and_new() {
        let mut fx = fixture(&[("blog", &[])]);
        let mut screen = entered(&mut fx);
        let mut frame = Compositor::new(TermSize::new(12, 6), Instant::now());

        screen.render(&fx.ctx, &mut frame);

        let out = frame.buffer();
        assert!(out.contains(&format!("\x1b[1;7m{}Work{}\x1b[m", " ".repeat(4), " ".repeat(4))));
        assert!(out.contains("\x1b[2;1H\x1b[1;7mblog\x1b[m"));
        assert!(out.contains("\x1b[3;1H\x1b[96mnew\x1b[m"));
        assert!(out.ends_with("\x1b[2;5H"));
    }

    #[test]
    fn renders_loaded_project_files() {
        let mut fx = fixture(&[("site", &["index.md"]), ("bare", &[])]);
        let mut screen = entered(&mut fx);
        let mut frame = Compositor::new(TermSize::new(20, 6), Instant::now());

        input(&mut screen, &mut fx, InputEvent::text("\r")).unwrap();
        screen.render(&fx.ctx, &mut frame);
        assert!(frame.buffer().contains("\x1b[2;1H\x1b[2m(no files)\x1b[m"));

        input(&mut screen, &mut fx, InputEvent::key(BACKSPACE)).unwrap();
        input(&mut screen, &mut fx, InputEvent::key(DOWN)).unwrap();
        input(&mut screen, &mut fx, InputEvent::text("\r")).unwrap();
        frame.reset();
        screen.render(&fx.ctx, &mut frame);
        assert!(frame.buffer().contains("\x1b[2;1H\x1b[1;7mindex.md\x1b[m"));
        assert!(frame.buffer().ends_with("\x1b[2;9H"));
    }

    #[test]
    fn names_from_disk_cannot_inject_escapes() {
        let tmp = TempDir::new().unwrap();
        let catalog = SourceCatalog::new(tmp.path(), ProviderRegistry::builtin());
        let id = catalog.create("Work\x1b[2J", "local").unwrap();
        let project = "evil\x1b]0;pwned\x07\nname";
        fs::create_dir_all(catalog.source_dir(&id).join(PROJECTS_DIR).join(project)).unwrap();
        let source = catalog.open_by_id(&id).unwrap();
        let mut ctx = AppContext::new(SettingsStore::in_memory(Default::default()), catalog);
        let mut screen = SourceScreen::new();
        screen.enter(&mut ctx, Some(Payload::OpenSource(source))).unwrap();
        let mut frame = Compositor::new(TermSize::new(20, 6), Instant::now());

        screen.render(&ctx, &mut frame);

        let out = frame.buffer();
        assert!(!out.contains("\x1b[2J"));
        assert!(!out.contains("\x1b]"));
        assert!(!out.contains('\x07'));
        assert!(!out.contains('\n'));
        assert!(out.contains(&format!("{}Work[2J{}", " ".repeat(6), " ".repeat(7))));
        assert!(out.contains("\x1b[2;1H\x1b[1;7mevil]0;pwnedname\x1b[m"));
        assert!(out.ends_with("\x1b[2;17H"));
    }

    #[test]
    fn unentered_screen_only_clears() {
        let fx = fixture(&[]);
        let mut screen = SourceScreen::new();
        let mut frame = Compositor::new(TermSize::new(20, 6), Instant::now());
        screen.render(&fx.ctx, &mut frame);
        assert_eq!(frame.buffer(), "\x1b[H\x1b[J");
    }
}
