use rendezvous::{LockName, LockNamespace, NamedLock, Result};

pub fn execute_probe(namespace: &LockNamespace, name: &str, claim: bool) -> Result<()> {
    let name = LockName::new(name)?;

    let state = if claim {
        if NamedLock::probe_claim(namespace, &name)? {
            "claimed"
        } else {
            "free"
        }
    } else if NamedLock::probe(namespace, &name)? {
        "present"
    } else {
        "absent"
    };

    println!("{}", state);
    Ok(())
}
