use regex::Regex;
use std::sync::LazyLock;

const SCHEME: &str = "^(?:https?://)?";
const SAFE_END: &str = "/?(?:$|\\?|#)";
const SEGMENT: &str = "[^/?#]+";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(
    SPOTIFY_REGEX,
    format!(
        r"(?i){}open\.spotify\.com/(?:intl-(?P<market>[a-z]{{2}})/)?(?P<kind>track|album|playlist|artist)/(?P<id>[a-z0-9]+){}",
        SCHEME, SAFE_END
    )
    .as_str()
);
// Must be tried before the general Apple Music grammar: the `i` parameter turns an album link into a song link.
regex!(
    APPLE_MUSIC_SONG_IN_ALBUM_REGEX,
    format!(
        r"(?i){}music\.apple\.com/(?P<market>[a-z]{{2}})/album/(?:{}/)?\d+/?\?(?:[^#]*&)?i=(?P<id>\d+)",
        SCHEME, SEGMENT
    )
    .as_str()
);
regex!(
    APPLE_MUSIC_REGEX,
    format!(
        r"(?i){}music\.apple\.com/(?P<market>[a-z]{{2}})/(?P<kind>album|song|playlist|artist)/(?:{}/)?(?P<id>{}){}",
        SCHEME, SEGMENT, SEGMENT, SAFE_END
    )
    .as_str()
);
regex!(
    YOUTUBE_MUSIC_WATCH_REGEX,
    format!(r"(?i){}music\.youtube\.com/watch/?\?(?:[^#]*&)?v=(?P<id>[a-z0-9_-]{{11}})", SCHEME).as_str()
);
regex!(
    YOUTUBE_WATCH_REGEX,
    format!(r"(?i){}(?:www\.|m\.)?youtube\.com/watch/?\?(?:[^#]*&)?v=(?P<id>[a-z0-9_-]{{11}})", SCHEME).as_str()
);
regex!(YOUTU_BE_REGEX, format!(r"(?i){}youtu\.be/(?P<id>[a-z0-9_-]{{11}}){}", SCHEME, SAFE_END).as_str());
regex!(
    YOUTUBE_PLAYLIST_REGEX,
    format!(
        r"(?i){}(?:www\.|music\.)?youtube\.com/(?:playlist|browse)/?\?(?:[^#]*&)?list=(?P<id>[a-z0-9_-]+)",
        SCHEME
    )
    .as_str()
);
regex!(
    YOUTUBE_MUSIC_BROWSE_REGEX,
    format!(r"(?i){}music\.youtube\.com/browse/(?P<id>[a-z0-9_-]+){}", SCHEME, SAFE_END).as_str()
);
// Sets first: the track grammar only accepts exactly two path segments, so it can never shadow a set.
regex!(
    SOUNDCLOUD_SET_REGEX,
    format!(r"(?i){}(?:www\.|m\.)?soundcloud\.com/(?P<id>{}/sets/{}){}", SCHEME, SEGMENT, SEGMENT, SAFE_END).as_str()
);
regex!(
    SOUNDCLOUD_TRACK_REGEX,
    format!(r"(?i){}(?:www\.|m\.)?soundcloud\.com/(?P<id>{}/{}){}", SCHEME, SEGMENT, SEGMENT, SAFE_END).as_str()
);
regex!(
    TIDAL_REGEX,
    format!(
        r"(?i){}(?:listen\.|www\.)?tidal\.com/(?:browse/)?(?P<kind>track|album|playlist|video|artist)/(?P<id>[a-z0-9-]+){}",
        SCHEME, SAFE_END
    )
    .as_str()
);
regex!(
    DEEZER_REGEX,
    format!(
        r"(?i){}(?:www\.)?deezer\.com/(?:[a-z]{{2}}(?:-[a-z]{{2}})?/)?(?P<kind>track|album|playlist|artist)/(?P<id>\d+){}",
        SCHEME, SAFE_END
    )
    .as_str()
);
regex!(HTTP_SCHEME_REGEX, r"(?i)^https?://");
