//! 16x16 PNG template images shown next to menu entries, base64-encoded.

/// Branch glyph.
pub const BRANCH_ICON: &str = "iVBORw0KGgoAAAANSUhEUgAAABAAAAAQCAYAAAAf8/9hAAAABmJLR0QA/wD/AP+gvaeTAAAA4UlEQVQ4jbXTPU4CURQF4I+JizBGlCWYYOU2YCH2LoBK0J7OSjZibEwktDairTgljVh4R99M3iRjoqd5P+fc8+5PHn+IUyxRYoZewvVwhffQDHMGK6yxwA7jhBvF3SI0y4ooElEfd5jE+TDhBrFOQtPPZTCLV3Z4w3HDYJPwlzmDAvMQHGX4QXBzSX/SEj7wEvvnjEGV9n0Ygb1cKnjFQeb+yVcjv9Fm8ICbluCyi8EY2xauhqKxr+rc7xLcxLWfMW3Ux9gJJW5xEibnXYLSEtY4w0Vy/hWGeIxMpuqf6f/wCZenMrU2gp2KAAAAAElFTkSuQmCC";

/// Pull-request glyph, also the menu-bar title image.
pub const PR_ICON: &str = "iVBORw0KGgoAAAANSUhEUgAAABAAAAAQCAYAAAAf8/9hAAAABmJLR0QA/wD/AP+gvaeTAAAA2UlEQVQ4jc3SMU4CURDG8R9WdJzAZI+AUJl4AHsbL4AHkILEigsQPYAHMHoAr0HsTQzSAxV0a7HzkhfyFtDKL9nMvplv/m+yO5ym/jFDB09Y4wPDrHaN7THADWq84jsgeXONCe7QKwHGYboIyCryb5HPn88SpIqmZJpFvov3yMFVvI9KU1RRfNZ8k6QuXrJzjWk6nGWFr4jL7EbY4bZ04z7gT/pfgCri+QFwq6fSbGH6jY8tza2e+0j2NYu0LgCKnjTGIuIDLjXrvK+Dnk6MtMEcgwLgFM/v9QO0iTrGPnzHMAAAAABJRU5ErkJggg==";

/// Repository glyph.
pub const REPO_ICON: &str = "iVBORw0KGgoAAAANSUhEUgAAABAAAAAQCAYAAAAf8/9hAAAABmJLR0QA/wD/AP+gvaeTAAAArUlEQVQ4je3TPQoCMRCG4UdZbLyCYG1nr4ew8iq2W9kuCNYeRE8hiKUH8ACLgqxNVuPP/tj7wsCQfPNlwiQ8GWKHC4qGOJRFnchghzE2uKlmislbLeHkZU1hSRq6AN1oo4drC4MXus2Sv8EvFDhr95AeY0zeTBKs1Y+zfEgfXLBq0WkadxCzxSnkedRqHtbmWATdV4MBZiH/dt+9hs8UU+AY8lGNrpIM/RBZnfAOVrU17mdpFrEAAAAASUVORK5CYII=";
