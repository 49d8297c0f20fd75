//! Dropping from root to an unprivileged user. Only meaningful when the
//! tests run as root; otherwise every test returns early.

use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Gid, Uid, User, fork, getgid, getgroups, getuid};

use streamgate_core::privilege::set_user;
use streamgate_test_utils::process::serial_guard;

const DROP_TO: &str = "nobody";

fn kept_root_group(groups: &[Gid], target: Gid) -> bool {
    let root = Gid::from_raw(0);
    target != root && groups.contains(&root)
}

#[test]
fn test_drop_replaces_root_groups() {
    let _serial = serial_guard();
    if !Uid::effective().is_root() {
        eprintln!("skipping: needs root");
        return;
    }
    let Some(target) = User::from_name(DROP_TO).unwrap() else {
        eprintln!("skipping: no '{DROP_TO}' user");
        return;
    };

    // SAFETY: the child only switches ids, inspects them and exits.
    match unsafe { fork() }.unwrap() {
        ForkResult::Child => {
            let code = match set_user(DROP_TO) {
                Err(_) => 2,
                Ok(()) if getuid() != target.uid || getgid() != target.gid => 3,
                Ok(()) => match getgroups() {
                    Ok(groups) if kept_root_group(&groups, target.gid) => 4,
                    Ok(_) => 0,
                    Err(_) => 5,
                },
            };
            std::process::exit(code);
        }
        ForkResult::Parent { child } => {
            assert_eq!(waitpid(child, None).unwrap(), WaitStatus::Exited(child, 0));
        }
    }
}
