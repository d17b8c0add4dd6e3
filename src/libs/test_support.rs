// Scripted stand-in for the host, shared by the unit tests.
//
// `FakeHost` implements `CommandRunner` and simulates just enough of a Debian box for the
// executor logic: dpkg records, apt-get install/purge, `getent passwd`, `chsh`, and
// `command -v` lookups. Anything else succeeds silently unless told to fail.

use crate::libs::run_context::RunContext;
use crate::libs::utilities::command_runner::{CommandOutput, CommandRunner, Invocation};
use crate::schemas::config::ProvisionConfig;
use crate::schemas::identity::TargetIdentity;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Default)]
struct HostState {
    packages: BTreeMap<String, (String, String)>,
    commands: BTreeSet<String>,
    login_shells: BTreeMap<String, String>,
    failing: Vec<String>,
    scripted: Vec<(String, CommandOutput)>,
    calls: Vec<Invocation>,
}

#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        FakeHost::default()
    }

    /// A context for user `dev` whose home is a fresh temp dir, owned by the test process
    /// (so chown to the "target" uid works without root).
    pub fn context() -> (RunContext, FakeHost, TempDir) {
        let home = TempDir::new().expect("temp home");
        let host = FakeHost::new();
        host.set_login_shell("dev", "/bin/bash");
        let ctx = RunContext::new(
            test_identity(home.path().to_path_buf()),
            ProvisionConfig::default(),
            Box::new(host.clone()),
            None,
        );
        (ctx, host, home)
    }

    pub fn install_package(&self, name: &str, version: &str) {
        self.add_package_record(name, "install ok installed", version);
        self.add_command(&command_for_package(name));
    }

    pub fn add_package_record(&self, name: &str, status: &str, version: &str) {
        self.state
            .borrow_mut()
            .packages
            .insert(name.to_string(), (status.to_string(), version.to_string()));
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.state
            .borrow()
            .packages
            .get(name)
            .is_some_and(|(status, _)| status.ends_with(" installed"))
    }

    pub fn add_command(&self, name: &str) {
        self.state.borrow_mut().commands.insert(name.to_string());
    }

    pub fn set_login_shell(&self, user: &str, shell: &str) {
        self.state
            .borrow_mut()
            .login_shells
            .insert(user.to_string(), shell.to_string());
    }

    pub fn login_shell(&self, user: &str) -> Option<String> {
        self.state.borrow().login_shells.get(user).cloned()
    }

    /// Every call whose display line contains `needle` exits 1.
    pub fn fail_on(&self, needle: &str) {
        self.state.borrow_mut().failing.push(needle.to_string());
    }

    /// Every call whose display line contains `needle` returns `output`.
    pub fn respond(&self, needle: &str, output: CommandOutput) {
        self.state
            .borrow_mut()
            .scripted
            .push((needle.to_string(), output));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .map(Invocation::display)
            .collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }

    fn simulate(&self, invocation: &Invocation) -> CommandOutput {
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        let mut state = self.state.borrow_mut();
        match invocation.program.as_str() {
            "dpkg-query" => {
                let package = args.last().copied().unwrap_or_default();
                match state.packages.get(package) {
                    Some((status, version)) => CommandOutput::ok(&format!("{status}\t{version}")),
                    None => CommandOutput::failed(1, "no packages found matching"),
                }
            }
            "apt-get" => {
                let packages = args.iter().skip(2).map(|p| p.to_string());
                match args.first().copied() {
                    Some("install") => {
                        for package in packages {
                            state.commands.insert(command_for_package(&package));
                            state
                                .packages
                                .insert(package, ("install ok installed".into(), "1.0".into()));
                        }
                    }
                    Some("purge") => {
                        for package in packages {
                            state.commands.remove(&command_for_package(&package));
                            state.packages.remove(&package);
                        }
                    }
                    _ => {}
                }
                CommandOutput::ok("")
            }
            "getent" => {
                let user = args.get(1).copied().unwrap_or_default();
                match state.login_shells.get(user) {
                    Some(shell) => {
                        CommandOutput::ok(&format!("{user}:x:1000:1000::/home/{user}:{shell}\n"))
                    }
                    None => CommandOutput::failed(2, ""),
                }
            }
            "chsh" => {
                if let [_, shell, user] = args.as_slice() {
                    state.login_shells.insert(user.to_string(), shell.to_string());
                }
                CommandOutput::ok("")
            }
            "bash" => {
                let script = args.get(1).copied().unwrap_or_default();
                match script.strip_prefix("command -v ") {
                    Some(name) if state.commands.contains(name.trim()) => {
                        CommandOutput::ok(&format!("/usr/bin/{}\n", name.trim()))
                    }
                    Some(_) => CommandOutput::failed(1, ""),
                    None => CommandOutput::ok(""),
                }
            }
            _ => CommandOutput::ok(""),
        }
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let line = invocation.display();
        self.state.borrow_mut().calls.push(invocation.clone());

        {
            let state = self.state.borrow();
            if state.failing.iter().any(|needle| line.contains(needle)) {
                return Ok(CommandOutput::failed(1, "simulated failure"));
            }
            if let Some((_, output)) = state
                .scripted
                .iter()
                .find(|(needle, _)| line.contains(needle))
            {
                return Ok(output.clone());
            }
        }
        Ok(self.simulate(invocation))
    }
}

pub fn test_identity(home: PathBuf) -> TargetIdentity {
    TargetIdentity {
        user: "dev".to_string(),
        uid: nix::unistd::getuid().as_raw(),
        gid: nix::unistd::getgid().as_raw(),
        home,
        login_shell: PathBuf::from("/bin/bash"),
    }
}

fn command_for_package(package: &str) -> String {
    match package {
        "fail2ban" => "fail2ban-client".to_string(),
        "build-essential" => "make".to_string(),
        other => other.to_string(),
    }
}
