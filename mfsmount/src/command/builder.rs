//! Builder for remote command invocations.

use super::action::RemoteAction;

/// An action plus its ordered argument list.
///
/// Arguments are kept as discrete strings and handed to the process spawn
/// primitive one by one; they are never joined into a shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    action: RemoteAction,
    args: Vec<String>,
}

impl RemoteCommand {
    /// Start a command for the given action.
    pub fn new(action: RemoteAction) -> Self {
        Self {
            action,
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The logical action.
    pub fn action(&self) -> RemoteAction {
        self.action
    }

    /// Full argv for the store binary: subcommand words, then arguments.
    pub fn to_argv(&self) -> Vec<String> {
        self.action
            .argv()
            .iter()
            .map(|s| s.to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_preserves_argument_order() {
        let cmd = RemoteCommand::new(RemoteAction::PinUpdate)
            .arg("QmOld")
            .arg("QmNew");
        assert_eq!(cmd.to_argv(), vec!["pin", "update", "QmOld", "QmNew"]);
    }

    #[test]
    fn test_argv_keeps_metacharacters_as_single_argument() {
        // A hostile path stays one argv entry; nothing is shell-parsed.
        let cmd = RemoteCommand::new(RemoteAction::FilesRm).arg("/a\"; rm -rf ~; echo \"");
        let argv = cmd.to_argv();
        assert_eq!(argv.len(), 3);
        assert_eq!(argv[2], "/a\"; rm -rf ~; echo \"");
    }

    #[test]
    fn test_argv_includes_fixed_flags() {
        let cmd = RemoteCommand::new(RemoteAction::NamePublish).arg("/ipfs/QmRoot");
        assert_eq!(
            cmd.to_argv(),
            vec!["name", "publish", "--allow-offline", "/ipfs/QmRoot"]
        );
    }

    #[test]
    fn test_args_extends_in_order() {
        let cmd =
            RemoteCommand::new(RemoteAction::FilesWrite).args(["--offset", "128", "/notes.txt"]);
        assert_eq!(
            cmd.to_argv(),
            vec!["files", "write", "--offset", "128", "/notes.txt"]
        );
    }
}
