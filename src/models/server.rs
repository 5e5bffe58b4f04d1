// Snapshot of guild introspection data rendered by `/serverinfo`

/// Channel tallies by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCounts {
    pub total: usize,
    pub text: usize,
    pub voice: usize,
    pub news: usize,
    /// Text channels @everyone cannot view
    pub locked_text: usize,
    /// Voice channels @everyone cannot view
    pub locked_voice: usize,
}

/// Everything `/serverinfo` shows, detached from the gateway cache
#[derive(Debug, Clone, Default)]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub owner: String,
    pub created: String,
    pub member_count: u64,
    pub role_count: usize,
    pub channels: ChannelCounts,
    pub boost_level: u8,
    pub boost_count: u64,
    pub verification_level: String,
    pub has_invite_splash: bool,
    pub has_animated_icon: bool,
}
