//! Console output for a transaction
//!
//! Every line goes through [`Console`] so that block output never lands in
//! the middle of a progress bar: a live bar is ended before anything else
//! is printed.

use crate::progress::ProgressRenderer;
use console::Style;
use pkc_events::{
    Description, EulaRequired, FileList, RepoDetail, SignatureRequired, TransactionMeta,
    UpdateDetail,
};
use pkc_types::{ErrorKind, PackageItem, ProgressSnapshot, RestartKind, Role};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const INFO_WIDTH: usize = 12;
const PACKAGE_WIDTH: usize = 40;
const REPO_WIDTH: usize = 28;

type Sink = Box<dyn Write + Send>;

/// Transaction output on stdout, failures on stderr
pub struct Console {
    out: Sink,
    err: Sink,
    renderer: ProgressRenderer,
    color: bool,
}

impl Console {
    #[must_use]
    pub fn new(out: Sink, err: Sink, renderer: ProgressRenderer, color: bool) -> Self {
        Self {
            out,
            err,
            renderer,
            color,
        }
    }

    /// Console on the process's standard streams
    #[must_use]
    pub fn stdio(renderer: ProgressRenderer, color: bool) -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()), renderer, color)
    }

    #[must_use]
    pub fn renderer(&self) -> &ProgressRenderer {
        &self.renderer
    }

    #[must_use]
    pub fn is_pulsing(&self) -> bool {
        self.renderer.is_pulsing()
    }

    fn paint(&self, style: &Style, text: &str) -> String {
        if self.color {
            style.clone().force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// End a live bar so the next output starts on its own line
    fn settle(&mut self) -> io::Result<()> {
        self.renderer.break_line(&mut self.out)
    }

    /// End any live bar, e.g. before bailing out
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn end_line(&mut self) -> io::Result<()> {
        self.settle()?;
        self.out.flush()
    }

    /// Print one plain line
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Print a failure line on stderr
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stderr.
    pub fn failure(&mut self, text: &str) -> io::Result<()> {
        self.settle()?;
        self.out.flush()?;
        let text = self.paint(&Style::new().red(), text);
        writeln!(self.err, "{text}")?;
        self.err.flush()
    }

    /// Report one package
    ///
    /// Listing roles get one line per package. Work roles get the package
    /// line followed by a live bar, completing the previous one first.
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn package(&mut self, role: Option<Role>, item: &PackageItem) -> io::Result<()> {
        let info = format!("{:<INFO_WIDTH$}", item.info.as_str());
        let id = &item.package_id;

        if !self.renderer.is_interactive() {
            writeln!(
                self.out,
                "{info} {}-{}.{}",
                id.name(),
                id.version(),
                id.arch()
            )?;
            return self.out.flush();
        }

        let package = format!("{:<PACKAGE_WIDTH$}", id.name_version());
        if role.is_some_and(Role::lists_packages) {
            self.renderer.complete(&mut self.out)?;
            self.settle()?;
            writeln!(self.out, "{info} {package}")?;
            return self.out.flush();
        }
        self.renderer
            .begin_item(&mut self.out, &format!("{info} {package}"))
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn progress(&mut self, snapshot: ProgressSnapshot) -> io::Result<()> {
        self.renderer.update(&mut self.out, snapshot)
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn tick(&mut self) -> io::Result<()> {
        self.renderer.tick(&mut self.out)
    }

    /// Complete the bar and print the runtime summary
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn finished(
        &mut self,
        role: Option<Role>,
        runtime: Duration,
        restart: RestartKind,
    ) -> io::Result<()> {
        self.renderer.complete(&mut self.out)?;
        self.renderer.stop_pulse();
        self.settle()?;
        let role = role.map_or("unknown", Role::as_str);
        writeln!(
            self.out,
            "{role} runtime was {:.1} seconds",
            runtime.as_secs_f64()
        )?;
        if restart.is_required() {
            writeln!(self.out, "Requires restart: {restart}")?;
        }
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn error_code(&mut self, code: ErrorKind, details: &str) -> io::Result<()> {
        self.settle()?;
        let label = self.paint(&Style::new().red().bold(), "Error:");
        writeln!(self.out, "{label} {code} : {details}")?;
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn transaction(&mut self, meta: &TransactionMeta) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "Transaction  : {}", meta.tid)?;
        writeln!(self.out, " timespec    : {}", meta.timespec)?;
        writeln!(self.out, " succeeded   : {}", u8::from(meta.succeeded))?;
        writeln!(self.out, " role        : {}", meta.role)?;
        writeln!(self.out, " duration    : {} (seconds)", meta.duration)?;
        writeln!(self.out, " data        : {}", meta.data)?;
        self.out.flush()
    }

    /// Print an update detail, skipping empty fields
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn update_detail(&mut self, detail: &UpdateDetail) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "Update detail")?;
        writeln!(self.out, "  package:    '{}'", detail.package_id)?;
        let fields = [
            ("updates:    ", &detail.updates),
            ("obsoletes:  ", &detail.obsoletes),
            ("vendor URL: ", &detail.vendor_url),
            ("bug URL:    ", &detail.bugzilla_url),
            ("cve URL:    ", &detail.cve_url),
        ];
        for (label, value) in fields {
            if !value.is_empty() {
                writeln!(self.out, "  {label}'{value}'")?;
            }
        }
        if detail.restart.is_required() {
            writeln!(self.out, "  restart:    '{}'", detail.restart)?;
        }
        if !detail.update_text.is_empty() {
            writeln!(self.out, "  update_text:'{}'", detail.update_text)?;
        }
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn description(&mut self, description: &Description) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "Package description")?;
        writeln!(self.out, "  package:     '{}'", description.package_id)?;
        writeln!(self.out, "  license:     '{}'", description.license)?;
        writeln!(self.out, "  group:       '{}'", description.group)?;
        writeln!(self.out, "  description: '{}'", description.description)?;
        writeln!(self.out, "  size:        '{}' bytes", description.size)?;
        writeln!(self.out, "  url:         '{}'", description.url)?;
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn files(&mut self, files: &FileList) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "Package files")?;
        if files.files.is_empty() {
            writeln!(self.out, "  no files")?;
        }
        for file in &files.files {
            writeln!(self.out, "  {file}")?;
        }
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn repo_detail(&mut self, repo: &RepoDetail) -> io::Result<()> {
        self.settle()?;
        let state = if repo.enabled { "enabled " } else { "disabled" };
        writeln!(
            self.out,
            "  {state}  {:<REPO_WIDTH$} {}",
            repo.repo_id, repo.description
        )?;
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn signature_required(&mut self, sig: &SignatureRequired) -> io::Result<()> {
        self.settle()?;
        let title = self.paint(&Style::new().yellow().bold(), "Repository Signature Required");
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "Package:     {}", sig.package_id)?;
        writeln!(self.out, "Name:        {}", sig.repository_name)?;
        writeln!(self.out, "URL:         {}", sig.key_url)?;
        writeln!(self.out, "User:        {}", sig.key_userid)?;
        writeln!(self.out, "ID:          {}", sig.key_id)?;
        writeln!(self.out, "Fingerprint: {}", sig.key_fingerprint)?;
        writeln!(self.out, "Timestamp:   {}", sig.key_timestamp)?;
        self.out.flush()
    }

    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn eula_required(&mut self, eula: &EulaRequired) -> io::Result<()> {
        self.settle()?;
        let title = self.paint(&Style::new().yellow().bold(), "Eula Required");
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "Eula:        {}", eula.eula_id)?;
        writeln!(self.out, "Package:     {}", eula.package_id)?;
        writeln!(self.out, "Vendor:      {}", eula.vendor_name)?;
        writeln!(self.out, "Agreement:   {}", eula.license_agreement)?;
        self.out.flush()
    }

    /// List candidates for the user to pick from, numbered from 1
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn multiple_matches(&mut self, items: &[PackageItem]) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "There are multiple matches")?;
        for (i, item) in items.iter().enumerate() {
            writeln!(self.out, "{}. {}", i + 1, item.package_id)?;
        }
        self.out.flush()
    }

    /// List packages a removal would take with it, numbered from 0
    ///
    /// # Errors
    ///
    /// Returns any error from writing to stdout.
    pub fn dependents(&mut self, items: &[PackageItem]) -> io::Result<()> {
        self.settle()?;
        writeln!(self.out, "The following packages have to be removed:")?;
        for (i, item) in items.iter().enumerate() {
            writeln!(self.out, "{i}\t{}", item.package_id.name_version())?;
        }
        self.out.flush()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("renderer", &self.renderer)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// In-memory output sink whose clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Everything written so far, lossily decoded
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
