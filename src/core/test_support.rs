use super::automation::{
    AutomationError, BrowserTabOperations, DesktopOperations, FolderLocation, RegistrationWait,
    Result, WindowCollectionOperations,
};
use super::models::{IdentityToken, WindowHandle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/*
 * Instrumented fake automation backend for unit tests. It plays both trait
 * roles (window collection and desktop), scripts how the host reacts to the
 * create-tab command, and counts every acquire/release of a tab reference so
 * tests can verify the ownership discipline: each fetched reference must be
 * released exactly once on every code path.
 */

/// Blueprint for one fake tab. Built with chained setters, mirroring the
/// queries `BrowserTabOperations` answers.
#[derive(Debug, Clone)]
pub struct TabSpec {
    identity: Option<usize>,
    window: isize,
    has_handle: bool,
    file_manager: bool,
    vanishes: bool,
    navigate_fails: bool,
    folder_view: Option<FolderLocation>,
    url: Option<String>,
    document_path: Option<String>,
}

impl TabSpec {
    pub fn new(identity: usize, window: isize) -> Self {
        Self {
            identity: Some(identity),
            window,
            has_handle: true,
            file_manager: true,
            vanishes: false,
            navigate_fails: false,
            folder_view: None,
            url: None,
            document_path: None,
        }
    }

    /// Shorthand: a plain filesystem folder at `path`.
    pub fn with_path(mut self, path: &str) -> Self {
        self.folder_view = Some(FolderLocation {
            filesystem_path: Some(path.to_string()),
            parsing_name: Some(path.to_string()),
        });
        self
    }

    pub fn with_folder_view(mut self, folder: FolderLocation) -> Self {
        self.folder_view = Some(folder);
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_document_path(mut self, path: &str) -> Self {
        self.document_path = Some(path.to_string());
        self
    }

    pub fn without_identity(mut self) -> Self {
        self.identity = None;
        self
    }

    pub fn without_handle(mut self) -> Self {
        self.has_handle = false;
        self
    }

    pub fn not_file_manager(mut self) -> Self {
        self.file_manager = false;
        self
    }

    /// The per-item fetch fails, as if the tab closed mid-enumeration.
    pub fn vanishing(mut self) -> Self {
        self.vanishes = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.navigate_fails = true;
        self
    }
}

/// Scripts the event-driven detection path of the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationScript {
    /// No notification source (default); the engine must poll.
    #[default]
    Unsupported,
    /// The wait elapses without a matching notification.
    TimesOut,
    /// The queued tab registers and is captured during the wait.
    CapturesQueuedTab,
}

struct QueuedTab {
    spec: TabSpec,
    armed: bool,
    remaining_pauses: u32,
}

#[derive(Default)]
struct FakeState {
    tabs: Vec<TabSpec>,
    queued: Vec<QueuedTab>,
    registration_script: RegistrationScript,
    fail_enumeration: bool,
    no_tab_host: bool,
    enumerations: usize,
    mutation_after: Option<(usize, Vec<TabSpec>)>,
    acquired: usize,
    released: usize,
    pauses: usize,
    new_tab_requests: Vec<WindowHandle>,
    closed: Vec<WindowHandle>,
    launched: Vec<String>,
    navigations: Vec<(Option<usize>, String)>,
}

#[derive(Clone)]
pub struct FakeShell {
    state: Arc<Mutex<FakeState>>,
}

impl FakeShell {
    pub fn new(tabs: Vec<TabSpec>) -> Self {
        let state = FakeState {
            tabs,
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Queues a tab the host will create in response to the next create-tab
    /// command, materializing after `appear_after_pauses` polling pauses
    /// (0 = immediately on command).
    pub fn queue_new_tab(&self, spec: TabSpec, appear_after_pauses: u32) {
        self.state.lock().unwrap().queued.push(QueuedTab {
            spec,
            armed: false,
            remaining_pauses: appear_after_pauses,
        });
    }

    pub fn set_registration_script(&self, script: RegistrationScript) {
        self.state.lock().unwrap().registration_script = script;
    }

    pub fn fail_enumeration(&self) {
        self.state.lock().unwrap().fail_enumeration = true;
    }

    /// Emulates a host version without a tabbed UI.
    pub fn remove_tab_host(&self) {
        self.state.lock().unwrap().no_tab_host = true;
    }

    /// Appends `tabs` to the collection once `enumerations` passes have
    /// completed, emulating concurrent user activity mid-operation.
    pub fn mutate_after_enumerations(&self, enumerations: usize, tabs: Vec<TabSpec>) {
        self.state.lock().unwrap().mutation_after = Some((enumerations, tabs));
    }

    pub fn acquired(&self) -> usize {
        self.state.lock().unwrap().acquired
    }

    pub fn released(&self) -> usize {
        self.state.lock().unwrap().released
    }

    pub fn live_references(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.acquired - state.released
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().unwrap().pauses
    }

    pub fn new_tab_requests(&self) -> Vec<WindowHandle> {
        self.state.lock().unwrap().new_tab_requests.clone()
    }

    pub fn closed_windows(&self) -> Vec<WindowHandle> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.state.lock().unwrap().launched.clone()
    }

    /// `(identity, destination)` pairs in navigation order.
    pub fn navigations(&self) -> Vec<(Option<usize>, String)> {
        self.state.lock().unwrap().navigations.clone()
    }

    fn make_tab(&self, spec: TabSpec) -> Box<dyn BrowserTabOperations> {
        self.state.lock().unwrap().acquired += 1;
        Box::new(FakeTab {
            spec,
            state: Arc::clone(&self.state),
        })
    }
}

impl WindowCollectionOperations for FakeShell {
    fn tab_count(&self) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_enumeration {
            return Err(AutomationError::Enumeration(
                "collection unavailable".to_string(),
            ));
        }
        state.enumerations += 1;
        if let Some((after, _)) = &state.mutation_after {
            if state.enumerations > *after {
                let (_, tabs) = state.mutation_after.take().unwrap();
                state.tabs.extend(tabs);
            }
        }
        Ok(state.tabs.len())
    }

    fn tab_at(&self, index: usize) -> Option<Box<dyn BrowserTabOperations>> {
        let spec = {
            let state = self.state.lock().unwrap();
            state.tabs.get(index)?.clone()
        };
        if spec.vanishes {
            return None;
        }
        Some(self.make_tab(spec))
    }

    fn wait_for_registration(
        &self,
        target: WindowHandle,
        baseline: &HashSet<IdentityToken>,
        _timeout: Duration,
    ) -> RegistrationWait {
        let script = self.state.lock().unwrap().registration_script;
        match script {
            RegistrationScript::Unsupported => RegistrationWait::Unsupported,
            RegistrationScript::TimesOut => RegistrationWait::TimedOut,
            RegistrationScript::CapturesQueuedTab => {
                let spec = {
                    let mut state = self.state.lock().unwrap();
                    let queued = if state.queued.is_empty() {
                        None
                    } else {
                        Some(state.queued.remove(0))
                    };
                    match queued {
                        Some(q) => {
                            state.tabs.push(q.spec.clone());
                            q.spec
                        }
                        None => return RegistrationWait::TimedOut,
                    }
                };
                if spec.window != target.0
                    || spec
                        .identity
                        .is_some_and(|id| baseline.contains(&IdentityToken(id)))
                {
                    return RegistrationWait::TimedOut;
                }
                RegistrationWait::Captured(self.make_tab(spec))
            }
        }
    }
}

impl DesktopOperations for FakeShell {
    fn find_tab_host(&self, window: WindowHandle) -> Option<WindowHandle> {
        if self.state.lock().unwrap().no_tab_host {
            return None;
        }
        // The tab-host control gets a derived pseudo-handle.
        Some(WindowHandle(window.0 + 1))
    }

    fn request_new_tab(&self, tab_host: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.new_tab_requests.push(tab_host);
        if let Some(entry) = state.queued.iter_mut().find(|q| !q.armed) {
            entry.armed = true;
            if entry.remaining_pauses == 0 {
                let spec = entry.spec.clone();
                state.queued.retain(|q| !(q.armed && q.remaining_pauses == 0));
                state.tabs.push(spec);
            }
        }
    }

    fn request_close(&self, window: WindowHandle) {
        self.state.lock().unwrap().closed.push(window);
    }

    fn launch_window(&self, destination: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .launched
            .push(destination.to_string());
        Ok(())
    }

    fn window_title(&self, window: WindowHandle) -> String {
        format!("Window {window}")
    }

    fn window_process_id(&self, _window: WindowHandle) -> u32 {
        4242
    }

    fn pause(&self, _interval: Duration) {
        let mut state = self.state.lock().unwrap();
        state.pauses += 1;
        let mut ready = Vec::new();
        for entry in state.queued.iter_mut().filter(|q| q.armed) {
            if entry.remaining_pauses > 0 {
                entry.remaining_pauses -= 1;
            }
            if entry.remaining_pauses == 0 {
                ready.push(entry.spec.clone());
            }
        }
        if !ready.is_empty() {
            state.queued.retain(|q| !(q.armed && q.remaining_pauses == 0));
            state.tabs.extend(ready);
        }
    }
}

struct FakeTab {
    spec: TabSpec,
    state: Arc<Mutex<FakeState>>,
}

impl BrowserTabOperations for FakeTab {
    fn identity(&self) -> Option<IdentityToken> {
        self.spec.identity.map(IdentityToken)
    }

    fn top_level_window(&self) -> Option<WindowHandle> {
        self.spec.has_handle.then_some(WindowHandle(self.spec.window))
    }

    fn is_file_manager(&self) -> bool {
        self.spec.file_manager
    }

    fn folder_view_location(&self) -> Option<FolderLocation> {
        self.spec.folder_view.clone()
    }

    fn location_url(&self) -> Option<String> {
        self.spec.url.clone()
    }

    fn document_folder_path(&self) -> Option<String> {
        self.spec.document_path.clone()
    }

    fn navigate(&self, destination: &str) -> Result<()> {
        if self.spec.navigate_fails {
            return Err(AutomationError::Navigation("refused by host".to_string()));
        }
        self.state
            .lock()
            .unwrap()
            .navigations
            .push((self.spec.identity, destination.to_string()));
        Ok(())
    }
}

impl Drop for FakeTab {
    fn drop(&mut self) {
        self.state.lock().unwrap().released += 1;
    }
}
