//! The overlay engine: every intercepted call enters here.
//!
//! Each operation takes the process-wide lock once, classifies its path,
//! and then either answers from the virtual tree, redirects the call to a
//! backing path, materializes a new entry in the scratch area, or hands the
//! call to the real filesystem unchanged. The lock is held until the
//! delegated call returns, so resolution and the mutation it leads to are
//! atomic with respect to other threads.

use std::io;

use diagnostics::{log_debug, log_info, log_warn};
use parking_lot::Mutex;

use crate::descriptor::{self, ParseReport};
use crate::error::{Error, Result};
use crate::glob;
use crate::host::{AttributeData, FileAttributes, FindData, FindOptions, OpenRequest, RealFs};
use crate::node::{Node, NodeID};
use crate::path::{
    file_name, is_absolute, join, normalize, split, split_last, strip_prefix_ci,
    with_trailing_separator,
};
use crate::proxy::CwdProxy;
use crate::resolver::{Located, Scope, classify};
use crate::search::{Listed, SearchHandle, SearchTable};
use crate::tree::{NodeSnapshot, Tree};

#[derive(Debug, Default)]
struct State {
    tree: Tree,
    searches: SearchTable,
    proxy: CwdProxy,
}

/// The engine context, constructed once per process
pub struct Overlay<R: RealFs> {
    real: R,
    scope_root: String,
    scratch_root: String,
    report: ParseReport,
    state: Mutex<State>,
}

fn tolerate_exists(result: io::Result<()>) -> Result<()> {
    match result {
        Err(err) if err.kind() != io::ErrorKind::AlreadyExists => Err(err.into()),
        _ => Ok(()),
    }
}

/// Creates `path` and whichever of its ancestors are missing
fn create_dir_all<R: RealFs>(real: &R, path: &str) -> io::Result<()> {
    let result = match real.create_directory(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let (parent, _) = split_last(path);
            if parent.is_empty() {
                return Err(err);
            }
            create_dir_all(real, parent)?;
            real.create_directory(path)
        }
        other => other,
    };
    match result {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        other => other,
    }
}

impl<R: RealFs> Overlay<R> {
    /// Builds the tree from `descriptor` and creates the scratch root along
    /// with any missing ancestors.
    ///
    /// A malformed descriptor is not an error: the engine starts with the
    /// part that parsed, see [`Overlay::descriptor_report`].
    pub fn new(real: R, scope_root: &str, scratch_root: &str, descriptor: &str) -> Result<Self> {
        let scope_root = normalize(scope_root);
        let scratch_root = normalize(scratch_root);

        let mut tree = Tree::new();
        let root = tree.root();
        let report = descriptor::parse(&mut tree, root, descriptor);
        log_info!(
            "Loaded descriptor: {folders} folders, {files} files",
            folders: report.folders,
            files: report.files
        );

        create_dir_all(&real, &scratch_root)?;
        log_debug!(
            "Overlay ready: scope {scope_root}, scratch {scratch_root}",
            scope_root: scope_root.as_str(),
            scratch_root: scratch_root.as_str()
        );

        Ok(Self {
            real,
            scope_root,
            scratch_root,
            report,
            state: Mutex::new(State {
                tree,
                ..State::default()
            }),
        })
    }

    pub fn real(&self) -> &R {
        &self.real
    }

    pub fn scope_root(&self) -> &str {
        &self.scope_root
    }

    pub fn scratch_root(&self) -> &str {
        &self.scratch_root
    }

    /// How the startup descriptor parsed
    pub fn descriptor_report(&self) -> &ParseReport {
        &self.report
    }

    /// Copy of the whole virtual tree
    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        let state = self.state.lock();
        state.tree.snapshot(state.tree.root())
    }

    /// Copy of the node at a path relative to the global root
    pub fn lookup(&self, virtual_path: &str) -> Option<NodeSnapshot> {
        let state = self.state.lock();
        let id = state.tree.resolve(state.tree.root(), &normalize(virtual_path))?;
        state.tree.snapshot(id)
    }

    /// The current tree in descriptor syntax
    pub fn render_descriptor(&self) -> String {
        descriptor::render(&self.state.lock().tree)
    }

    pub fn proxy(&self) -> CwdProxy {
        self.state.lock().proxy.clone()
    }

    /// Number of virtual searches not yet closed
    pub fn open_searches(&self) -> usize {
        self.state.lock().searches.len()
    }

    fn locate(&self, state: &State, path: &str) -> Scope {
        match self.real.full_path(path) {
            Ok(full) => classify(&state.tree, &state.proxy, &self.scope_root, &normalize(&full)),
            Err(err) => {
                log_debug!(
                    "Cannot canonicalize {path}, passing through: {err}",
                    path: path,
                    err: err
                );
                Scope::Outside
            }
        }
    }

    fn scratch_path(&self, tree: &Tree, folder: NodeID) -> String {
        join(&self.scratch_root, &tree.virtual_path(folder))
    }

    fn ensure_scratch_dir(&self, path: &str) -> Result<()> {
        tolerate_exists(self.real.create_directory(path))
    }

    /// Opens or creates a file.
    ///
    /// Virtual files are redirected to their backing path. A file that is
    /// neither virtual nor real is materialized in the scratch area when its
    /// parent folder is virtual.
    pub fn open(&self, path: &str, request: &OpenRequest) -> Result<R::File> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Scope::Inside(located) = self.locate(state, path) else {
            log_debug!("open {path}: out of scope", path: path);
            return Ok(self.real.open(path, request)?);
        };

        if let Some(id) = state.tree.resolve(located.root, &located.relative) {
            return match state.tree.get(id).and_then(Node::backing_path) {
                Some(backing) => {
                    log_debug!("open {path}: redirected to {backing}", path: path, backing: backing);
                    Ok(self.real.open(backing, request)?)
                }
                None => {
                    log_debug!("open {path}: virtual folder, passing through", path: path);
                    Ok(self.real.open(path, request)?)
                }
            };
        }

        if self.real.attributes(path).is_ok() {
            log_debug!("open {path}: real entry, passing through", path: path);
            return Ok(self.real.open(path, request)?);
        }

        if request.disposition.requires_existing() {
            return Err(Error::not_found(path));
        }

        self.materialize_file(state, &located, path, request)
    }

    fn materialize_file(
        &self,
        state: &mut State,
        located: &Located,
        path: &str,
        request: &OpenRequest,
    ) -> Result<R::File> {
        let (parent_path, leaf) = split_last(&located.relative);

        let mut folder = located.root;
        if !folder.is_root() {
            self.ensure_scratch_dir(&self.scratch_path(&state.tree, folder))?;
        }

        for segment in split(parent_path) {
            let Some(child) = state.tree.child(folder, segment) else {
                log_debug!(
                    "open {path}: {segment} is not virtual, passing through",
                    path: path,
                    segment: segment
                );
                return Ok(self.real.open(path, request)?);
            };
            if state.tree.get(child).is_some_and(Node::is_file) {
                return Err(Error::access_denied(path));
            }
            folder = child;
            self.ensure_scratch_dir(&self.scratch_path(&state.tree, folder))?;
        }

        let backing = join(&self.scratch_path(&state.tree, folder), leaf);
        let file = self.real.open(&backing, request)?;
        _ = state.tree.insert_file(folder, leaf, &backing)?;
        log_info!("Materialized {path} at {backing}", path: path, backing: backing.as_str());
        Ok(file)
    }

    /// Creates a directory, establishing any missing virtual ancestors
    pub fn create_directory(&self, path: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Scope::Inside(located) = self.locate(state, path) else {
            log_debug!("mkdir {path}: out of scope", path: path);
            return Ok(self.real.create_directory(path)?);
        };

        if state.tree.resolve(located.root, &located.relative).is_some() {
            return Err(Error::already_exists(path));
        }

        if self.real.attributes(path).is_ok() {
            log_debug!("mkdir {path}: real entry, passing through", path: path);
            return Ok(self.real.create_directory(path)?);
        }

        let (parent_path, leaf) = split_last(&located.relative);
        let segments = split(parent_path);

        let mut folder = located.root;
        let mut scratch_dirs = Vec::new();
        if !folder.is_root() {
            scratch_dirs.push(self.scratch_path(&state.tree, folder));
        }

        let mut existing = 0;
        for segment in &segments {
            let Some(child) = state.tree.child(folder, segment) else {
                break;
            };
            if state.tree.get(child).is_some_and(Node::is_file) {
                return Err(Error::access_denied(path));
            }
            folder = child;
            existing += 1;
            scratch_dirs.push(self.scratch_path(&state.tree, folder));
        }

        let mut scratch = self.scratch_path(&state.tree, folder);
        for name in segments[existing..].iter().chain(std::iter::once(&leaf)) {
            scratch = join(&scratch, name);
            scratch_dirs.push(scratch.clone());
        }

        for dir in &scratch_dirs {
            self.ensure_scratch_dir(dir)?;
        }

        for segment in &segments[existing..] {
            folder = state.tree.insert_folder(folder, segment)?;
        }
        _ = state.tree.insert_folder(folder, leaf)?;
        log_info!("Created virtual folder {path} at {scratch}", path: path, scratch: scratch.as_str());
        Ok(())
    }

    /// Deletes a virtual file and its backing file
    pub fn delete_file(&self, path: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Scope::Inside(located) = self.locate(state, path) else {
            return Ok(self.real.delete_file(path)?);
        };

        let found = state.tree.resolve(located.root, &located.relative).and_then(|id| {
            let backing = state.tree.get(id)?.backing_path()?.to_string();
            Some((id, backing))
        });
        let Some((id, backing)) = found else {
            log_debug!("delete {path}: not a virtual file, passing through", path: path);
            return Ok(self.real.delete_file(path)?);
        };

        _ = state.tree.remove(id);
        log_info!("Deleted virtual file {path}, backing {backing}", path: path, backing: backing.as_str());
        Ok(self.real.delete_file(&backing)?)
    }

    /// Removes an empty virtual folder and its scratch directory
    pub fn remove_directory(&self, path: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Scope::Inside(located) = self.locate(state, path) else {
            return Ok(self.real.remove_directory(path)?);
        };

        let found = state
            .tree
            .resolve(located.root, &located.relative)
            .filter(|id| !id.is_root())
            .and_then(|id| Some((id, state.tree.get(id)?.children()?.is_empty())));
        let Some((id, empty)) = found else {
            log_debug!("rmdir {path}: not a virtual folder, passing through", path: path);
            return Ok(self.real.remove_directory(path)?);
        };

        if !empty {
            return Err(Error::not_empty(path));
        }

        if state.proxy.tracked_root() == Some(id) {
            self.leave_tracked_folder(state, id)?;
        }

        let scratch = self.scratch_path(&state.tree, id);
        _ = state.tree.remove(id);
        log_info!("Removed virtual folder {path}", path: path);

        match self.real.remove_directory(&scratch) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Simple attributes; virtual folders report `DIRECTORY`
    pub fn attributes(&self, path: &str) -> Result<FileAttributes> {
        let state = self.state.lock();

        let Scope::Inside(located) = self.locate(&state, path) else {
            return Ok(self.real.attributes(path)?);
        };

        let node = state
            .tree
            .resolve(located.root, &located.relative)
            .and_then(|id| state.tree.get(id));
        match node {
            None => Ok(self.real.attributes(path)?),
            Some(node) => match node.backing_path() {
                Some(backing) => Ok(self.real.attributes(backing)?),
                None => Ok(FileAttributes::DIRECTORY),
            },
        }
    }

    /// Extended attributes; virtual folders report a zero-size directory
    /// with sentinel timestamps
    pub fn attribute_data(&self, path: &str) -> Result<AttributeData> {
        let state = self.state.lock();

        let Scope::Inside(located) = self.locate(&state, path) else {
            return Ok(self.real.attribute_data(path)?);
        };

        let node = state
            .tree
            .resolve(located.root, &located.relative)
            .and_then(|id| state.tree.get(id));
        match node {
            None => Ok(self.real.attribute_data(path)?),
            Some(node) => match node.backing_path() {
                Some(backing) => Ok(self.real.attribute_data(backing)?),
                None => Ok(AttributeData::virtual_folder()),
            },
        }
    }

    fn find_data(&self, listed: &Listed) -> FindData {
        let data = match listed {
            Listed::Folder(_) => AttributeData::virtual_folder(),
            Listed::File(backing) => self.real.attribute_data(backing).unwrap_or_else(|err| {
                log_warn!(
                    "Backing file {backing} unavailable: {err}",
                    backing: backing.as_str(),
                    err: err
                );
                AttributeData {
                    attributes: FileAttributes::NORMAL,
                    ..AttributeData::default()
                }
            }),
        };
        FindData {
            file_name: file_name(listed.path()).to_string(),
            data,
        }
    }

    pub fn find_first(&self, path: &str) -> Result<(SearchHandle<R::Search>, FindData)> {
        self.find_first_ex(path, FindOptions::default())
    }

    /// Starts a directory search.
    ///
    /// A virtual folder is listed from the tree alone, matching children
    /// against the final path component. Its listing never includes real
    /// entries, and an empty match is `NotFound` rather than a fallback.
    pub fn find_first_ex(
        &self,
        path: &str,
        options: FindOptions,
    ) -> Result<(SearchHandle<R::Search>, FindData)> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let passthrough = || -> Result<(SearchHandle<R::Search>, FindData)> {
            let (search, data) = self.real.find_first(path, options)?;
            Ok((SearchHandle::real(search), data))
        };

        let Scope::Inside(located) = self.locate(state, path) else {
            return passthrough();
        };

        // The scope root or tracked folder itself, with no pattern below it.
        if located.relative.is_empty() {
            log_debug!("find {path}: names the root itself, passing through", path: path);
            return passthrough();
        }

        let (folder_path, pattern) = split_last(&located.relative);
        let Some(children) = state
            .tree
            .resolve(located.root, folder_path)
            .and_then(|id| state.tree.get(id))
            .and_then(Node::children)
        else {
            log_debug!("find {path}: not a virtual folder, passing through", path: path);
            return passthrough();
        };

        let base = join(&located.prefix, folder_path);
        let mut listing = Vec::new();
        for entry in children.iter().filter(|entry| glob::matches(pattern, &entry.name)) {
            match state.tree.get(entry.id).and_then(Node::backing_path) {
                Some(_) if options.directories_only => {}
                Some(backing) => listing.push(Listed::File(backing.to_string())),
                None => listing.push(Listed::Folder(join(&base, &entry.name))),
            }
        }

        let id = state.searches.open(listing);
        let Some(first) = state.searches.pop(id) else {
            _ = state.searches.close(id);
            return Err(Error::not_found(path));
        };
        log_debug!("find {path}: virtual listing", path: path);
        Ok((SearchHandle::virtual_listing(id), self.find_data(&first)))
    }

    pub fn find_next(&self, handle: &mut SearchHandle<R::Search>) -> Result<FindData> {
        if let Some(search) = handle.real_mut() {
            return self.real.find_next(search)?.ok_or(Error::NoMoreFiles);
        }

        let mut state = self.state.lock();
        let listed = handle
            .virtual_id()
            .and_then(|id| state.searches.pop(id))
            .ok_or(Error::NoMoreFiles)?;
        Ok(self.find_data(&listed))
    }

    pub fn find_close(&self, handle: SearchHandle<R::Search>) -> Result<()> {
        match handle.into_real() {
            Ok(search) => Ok(self.real.find_close(search)?),
            Err(id) => {
                _ = self.state.lock().searches.close(id);
                Ok(())
            }
        }
    }

    /// The apparent working directory while the proxy is enabled
    pub fn current_directory(&self) -> Result<String> {
        let state = self.state.lock();
        match state.proxy.apparent_cwd() {
            Some(apparent) => Ok(apparent.to_string()),
            None => Ok(self.real.current_directory()?),
        }
    }

    /// Changes directory, enabling the proxy when the target is a virtual
    /// folder below the scope root.
    pub fn set_current_directory(&self, path: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Relative paths are taken from where the application believes it is.
        let (apparent, target) = match state.proxy.apparent_cwd() {
            Some(cwd) if !is_absolute(path) => {
                let apparent = normalize(&join(cwd, path));
                (apparent.clone(), apparent)
            }
            _ => match self.real.full_path(path) {
                Ok(full) => (normalize(&full), path.to_string()),
                Err(_) => (String::new(), path.to_string()),
            },
        };

        let folder = strip_prefix_ci(&apparent, &self.scope_root)
            .filter(|rest| !rest.is_empty())
            .and_then(|rest| state.tree.resolve(state.tree.root(), rest))
            .filter(|id| state.tree.get(*id).is_some_and(Node::is_folder));

        let Some(folder) = folder else {
            if state.proxy.is_enabled() {
                log_info!("Proxy disabled by chdir to {path}", path: path);
            }
            state.proxy = CwdProxy::Disabled;
            return Ok(self.real.set_current_directory(&target)?);
        };

        self.enter_folder(state, folder, apparent)
    }

    /// Points the real cwd at the scratch directory of `folder` and enables
    /// the proxy with `apparent` as the reported directory
    fn enter_folder(&self, state: &mut State, folder: NodeID, apparent: String) -> Result<()> {
        let mut chain = Vec::new();
        let mut current = Some(folder);
        while let Some(id) = current.filter(|id| !id.is_root()) {
            chain.push(id);
            current = state.tree.get(id).and_then(Node::parent);
        }
        for id in chain.iter().rev() {
            self.ensure_scratch_dir(&self.scratch_path(&state.tree, *id))?;
        }

        let synthetic_cwd = with_trailing_separator(&self.scratch_path(&state.tree, folder));
        self.real.set_current_directory(&synthetic_cwd)?;
        log_info!(
            "Proxy enabled: {apparent} is backed by {synthetic}",
            apparent: apparent.as_str(),
            synthetic: synthetic_cwd.as_str()
        );

        state.proxy = CwdProxy::Enabled {
            tracked_root: folder,
            synthetic_cwd,
            apparent_cwd: apparent,
        };
        Ok(())
    }

    /// Moves the working directory from the tracked folder `id` to its
    /// parent, before the folder's scratch directory goes away. A virtual
    /// parent keeps the proxy enabled; the root disables it.
    fn leave_tracked_folder(&self, state: &mut State, id: NodeID) -> Result<()> {
        let apparent = state.proxy.apparent_cwd().unwrap_or_default().to_string();
        let (apparent_parent, _) = split_last(&apparent);
        let apparent_parent = apparent_parent.to_string();

        match state.tree.get(id).and_then(Node::parent) {
            Some(parent) if !parent.is_root() => {
                self.enter_folder(state, parent, apparent_parent)
            }
            _ => {
                self.real.set_current_directory(&apparent_parent)?;
                state.proxy = CwdProxy::Disabled;
                log_info!(
                    "Proxy disabled: tracked folder removed, cwd is {target}",
                    target: apparent_parent.as_str()
                );
                Ok(())
            }
        }
    }
}
