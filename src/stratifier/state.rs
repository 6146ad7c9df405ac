use super::*;

#[derive(Debug, Clone)]
pub(crate) struct Subscription {
    pub(crate) enonce1: Extranonce,
}

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) enonce1: Extranonce,
    pub(crate) address: Address,
    pub(crate) workername: String,
    pub(crate) username: Username,
}

#[derive(Debug)]
enum Inner {
    Fresh {
        version_mask: Option<Version>,
    },

    Subscribed {
        enonce1: Extranonce,
        user_agent: String,
        version_mask: Option<Version>,
    },

    Working {
        user_agent: String,
        version_mask: Option<Version>,
        session: Arc<Session>,
    },
}

#[derive(Debug)]
pub(crate) struct State(Inner);

impl State {
    pub(crate) fn new() -> Self {
        State(Inner::Fresh { version_mask: None })
    }

    pub(crate) fn configure(&mut self, version_mask: Version) -> bool {
        match &mut self.0 {
            Inner::Fresh {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
            Inner::Subscribed {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
            Inner::Working {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
        }

        true
    }

    pub(crate) fn subscribe(&mut self, enonce1: Extranonce, user_agent: String) {
        let version_mask = self.version_mask();
        self.0 = Inner::Subscribed {
            enonce1,
            user_agent,
            version_mask,
        };
    }

    pub(crate) fn authorize(
        &mut self,
        address: Address,
        workername: String,
        username: Username,
    ) -> bool {
        let Inner::Subscribed {
            enonce1,
            user_agent,
            version_mask,
        } = &self.0
        else {
            return false;
        };

        self.0 = Inner::Working {
            user_agent: user_agent.clone(),
            version_mask: *version_mask,
            session: Arc::new(Session {
                enonce1: enonce1.clone(),
                address,
                workername,
                username,
            }),
        };

        true
    }

    pub(crate) fn version_mask(&self) -> Option<Version> {
        match &self.0 {
            Inner::Fresh { version_mask } => *version_mask,
            Inner::Subscribed { version_mask, .. } => *version_mask,
            Inner::Working { version_mask, .. } => *version_mask,
        }
    }

    pub(crate) fn user_agent(&self) -> Option<&str> {
        match &self.0 {
            Inner::Fresh { .. } => None,
            Inner::Subscribed { user_agent, .. } => Some(user_agent),
            Inner::Working { user_agent, .. } => Some(user_agent),
        }
    }

    pub(crate) fn not_subscribed(&self) -> bool {
        matches!(self.0, Inner::Fresh { .. })
    }

    pub(crate) fn subscribed(&self) -> Option<Subscription> {
        match &self.0 {
            Inner::Fresh { .. } => None,
            Inner::Subscribed { enonce1, .. } => Some(Subscription {
                enonce1: enonce1.clone(),
            }),
            Inner::Working { session, .. } => Some(Subscription {
                enonce1: session.enonce1.clone(),
            }),
        }
    }

    pub(crate) fn working(&self) -> Option<Arc<Session>> {
        match &self.0 {
            Inner::Working { session, .. } => Some(session.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_fresh(&self) -> bool {
        matches!(self.0, Inner::Fresh { .. })
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        matches!(self.0, Inner::Subscribed { .. })
    }

    pub(crate) fn is_working(&self) -> bool {
        matches!(self.0, Inner::Working { .. })
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.0 {
            Inner::Fresh { version_mask: None } => write!(f, "Init"),
            Inner::Fresh {
                version_mask: Some(_),
            } => write!(f, "Configured"),
            Inner::Subscribed { .. } => write!(f, "Subscribed"),
            Inner::Working { .. } => write!(f, "Working"),
        }
    }
}
